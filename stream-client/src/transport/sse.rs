//! SseTransport - event stream over HTTP using Server-Sent Events.
//!
//! Opens a long-lived GET request and splits the response body into
//! named events with [`SseParser`]. A dropped connection ends the stream;
//! reconnecting is left to the owner.
//!
//! `recv` holds the stream lock while it waits for the next chunk, so
//! `close` first wakes any pending `recv` and then takes the lock.

use super::{StreamRequest, Transport, TransportError};
use async_trait::async_trait;
use flagstream_core::SseParser;
use flagstream_types::RawEvent;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Active stream state: body chunks plus parsed events not yet returned.
struct ActiveStream {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: SseParser,
    ready: VecDeque<RawEvent>,
}

/// SseTransport implements the Transport trait over an HTTP SSE response.
///
/// # Example
///
/// ```ignore
/// let transport = SseTransport::new(Duration::from_secs(10));
/// transport.connect(&request).await?;
/// let event = transport.recv().await?;
/// ```
pub struct SseTransport {
    connect_timeout: Duration,
    connected: AtomicBool,
    closing: Notify,
    stream: Mutex<Option<ActiveStream>>,
}

impl SseTransport {
    /// Create a transport with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            connected: AtomicBool::new(false),
            closing: Notify::new(),
            stream: Mutex::new(None),
        }
    }

    fn build_client(&self, proxy: Option<&str>) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TransportError::ConnectionFailed(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))
    }

    fn disconnect(&self, stream: &mut Option<ActiveStream>) {
        *stream = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self, request: &StreamRequest) -> Result<(), TransportError> {
        let client = self.build_client(request.proxy.as_deref())?;

        let mut builder = client
            .get(&request.url)
            .header("Accept", "text/event-stream");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        let mut stream = self.stream.lock().await;
        *stream = Some(ActiveStream {
            body,
            parser: SseParser::new(),
            ready: VecDeque::new(),
        });
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("SSE stream opened: {}", request.url);
        Ok(())
    }

    async fn recv(&self) -> Result<RawEvent, TransportError> {
        // Registered before the connected check so a racing close is never missed
        let closing = self.closing.notified();
        tokio::pin!(closing);
        closing.as_mut().enable();

        let mut guard = self.stream.lock().await;
        if !self.connected.load(Ordering::SeqCst) {
            self.disconnect(&mut guard);
            return Err(TransportError::NotConnected);
        }

        loop {
            let active = guard.as_mut().ok_or(TransportError::NotConnected)?;

            if let Some(event) = active.ready.pop_front() {
                return Ok(event);
            }

            let next = tokio::select! {
                biased;
                _ = closing.as_mut() => None,
                chunk = active.body.next() => Some(chunk),
            };
            match next {
                None => {
                    self.disconnect(&mut guard);
                    return Err(TransportError::NotConnected);
                }
                Some(Some(Ok(bytes))) => {
                    let events = active.parser.feed(&bytes);
                    active
                        .ready
                        .extend(events.into_iter().map(|event| event.into_raw()));
                }
                Some(Some(Err(e))) => {
                    self.disconnect(&mut guard);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                Some(None) => {
                    self.disconnect(&mut guard);
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.closing.notify_waiters();
        let mut stream = self.stream.lock().await;
        self.disconnect(&mut stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{event_stream, response, CannedServer};
    use std::sync::Arc;

    fn request(base_url: &str) -> StreamRequest {
        StreamRequest {
            url: format!("{}/all", base_url),
            headers: vec![("Authorization".into(), "sdk-key".into())],
            proxy: None,
        }
    }

    #[tokio::test]
    async fn receives_events_until_body_ends() {
        let server = CannedServer::respond(event_stream(concat!(
            ":keepalive\n\n",
            "event: put\ndata: {\"path\":\"/\",\"data\":{}}\n\n",
            "event: patch\ndata: {\"path\":\"/flags/beta\",\"data\":{\"key\":\"beta\",\"version\":2}}\n\n",
            "event: delete\r\ndata: {\"path\":\"/flags/beta\",\"version\":3}\r\n\r\n",
            "event: indirect/put\n\n",
        )))
        .await;
        let transport = SseTransport::new(Duration::from_secs(1));

        transport.connect(&request(&server.base_url)).await.unwrap();
        assert!(transport.is_connected());

        assert_eq!(
            transport.recv().await.unwrap(),
            RawEvent::new("put", r#"{"path":"/","data":{}}"#)
        );
        assert_eq!(
            transport.recv().await.unwrap(),
            RawEvent::new(
                "patch",
                r#"{"path":"/flags/beta","data":{"key":"beta","version":2}}"#
            )
        );
        assert_eq!(
            transport.recv().await.unwrap(),
            RawEvent::new("delete", r#"{"path":"/flags/beta","version":3}"#)
        );
        assert_eq!(transport.recv().await.unwrap(), RawEvent::bare("indirect/put"));

        let ended = transport.recv().await;
        assert!(matches!(ended, Err(TransportError::ConnectionClosed)));
        assert!(!transport.is_connected());

        let head = server.request().await;
        assert!(head.starts_with("get /all http/1.1"));
        assert!(head.contains("accept: text/event-stream"));
        assert!(head.contains("authorization: sdk-key"));
    }

    #[tokio::test]
    async fn unauthorized_response_fails_connect_with_status() {
        let server = CannedServer::respond(response("401 Unauthorized", "text/plain", "")).await;
        let transport = SseTransport::new(Duration::from_secs(1));

        let result = transport.connect(&request(&server.base_url)).await;
        assert!(matches!(result, Err(TransportError::Status { status: 401 })));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn close_wakes_pending_recv() {
        let server = CannedServer::respond_and_hold(event_stream("")).await;
        let transport = Arc::new(SseTransport::new(Duration::from_secs(1)));
        transport.connect(&request(&server.base_url)).await.unwrap();

        let receiver = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), transport.close())
            .await
            .expect("close waited on recv")
            .unwrap();
        let received = tokio::time::timeout(Duration::from_secs(2), receiver)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(received, Err(TransportError::NotConnected)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn new_transport_is_disconnected() {
        let transport = SseTransport::new(Duration::from_secs(1));
        assert!(!transport.is_connected());

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn close_without_connect_is_ok() {
        let transport = SseTransport::new(Duration::from_secs(1));
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn refused_connection_fails_connect() {
        let transport = SseTransport::new(Duration::from_secs(1));
        let request = StreamRequest {
            url: "http://127.0.0.1:1/flags".into(),
            headers: vec![("Authorization".into(), "sdk-key".into())],
            proxy: None,
        };

        let result = transport.connect(&request).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }
}
