//! Single-connection HTTP server for exercising the network clients.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// A server that accepts one connection and answers it with canned bytes.
pub(crate) struct CannedServer {
    /// `http://127.0.0.1:<port>`
    pub(crate) base_url: String,
    request: oneshot::Receiver<String>,
}

impl CannedServer {
    /// Answer the first request with `response`, then close the connection.
    pub(crate) async fn respond(response: String) -> Self {
        Self::spawn(response, false).await
    }

    /// Answer the first request with `response` and keep the connection
    /// open without sending anything more.
    pub(crate) async fn respond_and_hold(response: String) -> Self {
        Self::spawn(response, true).await
    }

    async fn spawn(response: String, hold: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (request_tx, request) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let head = read_head(&mut socket).await;
            let _ = request_tx.send(head);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            if hold {
                std::future::pending::<()>().await;
            }
        });

        Self { base_url, request }
    }

    /// The request head the server received, lowercased.
    pub(crate) async fn request(self) -> String {
        self.request.await.unwrap().to_lowercase()
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// A complete response with a `Content-Length` body.
pub(crate) fn response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// An event stream response whose body runs until the connection closes.
pub(crate) fn event_stream(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n{}",
        body
    )
}
