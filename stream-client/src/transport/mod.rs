//! Transport abstraction for flagstream.
//!
//! This module provides a pluggable transport layer that abstracts
//! the persistent event connection (SSE over HTTP, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` opens the event stream
//! - `recv()` yields the next named event, in server order
//! - `close()` releases all resources
//!
//! Reconnection and backoff, if any, belong to the implementation and
//! are invisible to the processor.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_event(RawEvent::new("put", "{}"));
//! transport.connect(&request).await?;
//! let event = transport.recv().await?;
//! ```

mod mock;
mod sse;

pub use mock::MockTransport;
pub use sse::SseTransport;

use async_trait::async_trait;
use flagstream_types::{RawEvent, StreamError};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Server answered with a non-success status.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

impl TransportError {
    /// Whether the stream is gone and no further events can arrive.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionClosed)
    }

    /// Numeric code for the error channel.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Status { status } => Some(i64::from(*status)),
            _ => None,
        }
    }
}

impl From<TransportError> for StreamError {
    fn from(err: TransportError) -> Self {
        StreamError::transport(err.to_string(), err.code())
    }
}

/// What a transport needs to open the event stream.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Full stream endpoint URL.
    pub url: String,
    /// Headers sent with the request (authorization, user agent).
    pub headers: Vec<(String, String)>,
    /// Optional outbound proxy URL.
    pub proxy: Option<String>,
}

impl StreamRequest {
    /// Look up a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl std::fmt::Debug for StreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.as_str(), "[REDACTED]")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("StreamRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Transport trait for receiving flag stream events.
///
/// Implementations must deliver events in the order the server sent
/// them and never concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the event stream described by `request`.
    async fn connect(&self, request: &StreamRequest) -> Result<(), TransportError>;

    /// Receive the next event.
    ///
    /// Must be cancel-safe: dropping the future before it resolves must
    /// not lose an event. Returns `ConnectionClosed` once the stream ends.
    async fn recv(&self) -> Result<RawEvent, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection and release its resources.
    async fn close(&self) -> Result<(), TransportError>;
}
