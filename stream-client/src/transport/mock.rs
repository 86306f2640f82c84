//! Mock transport for testing.
//!
//! Allows queueing events and forcing failures, and records what the
//! processor asked of the connection.

use super::{StreamRequest, Transport, TransportError};
use async_trait::async_trait;
use flagstream_types::RawEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// By default `recv()` reports `ConnectionClosed` once the queue is
/// drained. With [`MockTransport::hold_open`] it waits for more events
/// instead, like a live stream.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    wake: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    hold_open: bool,
    request: Option<StreamRequest>,
    connect_count: usize,
    close_count: usize,
    events: VecDeque<RawEvent>,
    fail_next_connect: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event to be returned by a later `recv()` call.
    pub fn queue_event(&self, event: RawEvent) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push_back(event);
        drop(inner);
        self.wake.notify_one();
    }

    /// Keep the stream open when the queue is empty.
    pub fn hold_open(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.hold_open = true;
    }

    /// End a held-open stream once the queue drains.
    pub fn end_stream(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.hold_open = false;
        drop(inner);
        self.wake.notify_one();
    }

    /// Get the request the transport was connected with.
    pub fn connected_request(&self) -> Option<StreamRequest> {
        let inner = self.inner.lock().unwrap();
        inner.request.clone()
    }

    /// Number of `connect()` calls.
    pub fn connect_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_count
    }

    /// Number of `close()` calls.
    pub fn close_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.close_count
    }

    /// Number of queued events not yet received.
    pub fn pending_events(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.events.len()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
        drop(inner);
        self.wake.notify_one();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            wake: Arc::clone(&self.wake),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, request: &StreamRequest) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_count += 1;

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.request = Some(request.clone());
        Ok(())
    }

    async fn recv(&self) -> Result<RawEvent, TransportError> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();

                if !inner.connected {
                    return Err(TransportError::NotConnected);
                }

                // Check for forced failure
                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }

                if let Some(event) = inner.events.pop_front() {
                    return Ok(event);
                }

                if !inner.hold_open {
                    return Err(TransportError::ConnectionClosed);
                }
            }
            self.wake.notified().await;
        }
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.close_count += 1;
        drop(inner);
        self.wake.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StreamRequest {
        StreamRequest {
            url: "https://stream.test/flags".into(),
            headers: vec![("Authorization".into(), "sdk-key".into())],
            proxy: None,
        }
    }

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_connects() {
        let transport = MockTransport::new();
        assert!(!transport.is_connected());

        transport.connect(&request()).await.unwrap();

        assert!(transport.is_connected());
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(
            transport.connected_request().unwrap().url,
            "https://stream.test/flags"
        );
    }

    #[tokio::test]
    async fn mock_transport_receives_in_order() {
        let transport = MockTransport::new();
        transport.connect(&request()).await.unwrap();

        transport.queue_event(RawEvent::new("put", "{}"));
        transport.queue_event(RawEvent::bare("indirect/put"));

        assert_eq!(transport.recv().await.unwrap().name, "put");
        assert_eq!(transport.recv().await.unwrap().name, "indirect/put");
    }

    #[tokio::test]
    async fn drained_queue_returns_closed() {
        let transport = MockTransport::new();
        transport.connect(&request()).await.unwrap();

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn held_open_stream_waits_for_events() {
        let transport = MockTransport::new();
        transport.hold_open();
        transport.connect(&request()).await.unwrap();

        let receiver = transport.clone();
        let handle = tokio::spawn(async move { receiver.recv().await });

        tokio::task::yield_now().await;
        transport.queue_event(RawEvent::new("patch", "{}"));

        let event = handle.await.unwrap().unwrap();
        assert_eq!(event.name, "patch");
    }

    #[tokio::test]
    async fn close_wakes_held_open_receiver() {
        let transport = MockTransport::new();
        transport.hold_open();
        transport.connect(&request()).await.unwrap();

        let receiver = transport.clone();
        let handle = tokio::spawn(async move { receiver.recv().await });

        tokio::task::yield_now().await;
        transport.close().await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(TransportError::NotConnected)));
        assert_eq!(transport.close_count(), 1);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn recv_without_connect_fails() {
        let transport = MockTransport::new();

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn forced_connect_failure() {
        let transport = MockTransport::new();
        transport.fail_next_connect("network unreachable");

        let result = transport.connect(&request()).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn forced_recv_failure() {
        let transport = MockTransport::new();
        transport.connect(&request()).await.unwrap();
        transport.queue_event(RawEvent::new("put", "{}"));
        transport.fail_next_recv("stream reset");

        let result = transport.recv().await;
        assert!(matches!(result, Err(TransportError::ReceiveFailed(_))));

        // Next recv should work (and get the queued event)
        let event = transport.recv().await.unwrap();
        assert_eq!(event.name, "put");
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_clone_shares_state() {
        let transport1 = MockTransport::new();
        let transport2 = transport1.clone();

        transport1.connect(&request()).await.unwrap();
        assert!(transport2.is_connected());

        transport2.queue_event(RawEvent::new("delete", "{}"));
        assert_eq!(transport1.pending_events(), 1);
    }
}
