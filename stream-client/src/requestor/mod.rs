//! Secondary fetch client used by indirect events.
//!
//! `indirect/put` and `indirect/patch` carry no usable flag data; the
//! processor asks a [`Requestor`] for it instead. Bodies come back as raw
//! text and go through the same decoder as inline payloads.

mod http;
mod mock;

pub use http::HttpRequestor;
pub use mock::MockRequestor;

use async_trait::async_trait;
use flagstream_types::{EventKind, StreamError};
use thiserror::Error;

/// Secondary fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

impl FetchError {
    /// Numeric code for the error channel.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Status { status } => Some(i64::from(*status)),
            Self::Request(_) => None,
        }
    }

    /// Convert into a reportable error for the indirect event that asked.
    pub fn into_stream_error(self, event: EventKind) -> StreamError {
        StreamError::fetch(event, self.to_string(), self.code())
    }
}

/// Fetch client for out-of-band flag requests.
#[async_trait]
pub trait Requestor: Send + Sync {
    /// Request the full flag set; returns the raw body.
    async fn request_all_flags(&self) -> Result<String, FetchError>;

    /// Request one flag by key; returns the raw body.
    async fn request_flag(&self, key: &str) -> Result<String, FetchError>;
}
