//! The reportable error value for flagstream.
//!
//! Every failure the engine surfaces (transport, missing payload, decode,
//! secondary fetch) is one [`StreamError`], delivered exactly once through
//! the owner's error channel.

use thiserror::Error;

use crate::EventKind;

/// Message used when an event that needs data arrives without any.
pub const UNEXPECTED_PAYLOAD: &str = "Unexpected payload from event stream";

/// Where a [`StreamError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised by the transport itself.
    Transport,
    /// Event of a kind that requires data arrived without any.
    UnexpectedPayload(EventKind),
    /// Payload present but not parseable into the expected structure.
    Decode(EventKind),
    /// Secondary fetch for an indirect event failed.
    Fetch(EventKind),
}

/// Error value reported through the error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StreamError {
    /// Origin of the error.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Optional numeric code (HTTP status for transport/fetch failures).
    pub code: Option<i64>,
}

impl StreamError {
    /// Transport failure, forwarded with its message and code.
    pub fn transport(message: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            code,
        }
    }

    /// Missing payload on an event that requires one.
    pub fn unexpected_payload(event: EventKind) -> Self {
        Self {
            kind: ErrorKind::UnexpectedPayload(event),
            message: UNEXPECTED_PAYLOAD.to_string(),
            code: None,
        }
    }

    /// Decode failure tagged with the event kind, the raw payload and the cause.
    pub fn decode(event: EventKind, raw: &str, cause: &serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Decode(event),
            message: format!("[{}] Data {}\n{}", event, raw, cause),
            code: None,
        }
    }

    /// Secondary fetch failure for an indirect event.
    pub fn fetch(event: EventKind, message: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            kind: ErrorKind::Fetch(event),
            message: message.into(),
            code,
        }
    }

    /// The event kind this error is tagged with, if any.
    pub fn event(&self) -> Option<EventKind> {
        match self.kind {
            ErrorKind::Transport => None,
            ErrorKind::UnexpectedPayload(event)
            | ErrorKind::Decode(event)
            | ErrorKind::Fetch(event) => Some(event),
        }
    }

    /// Whether this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode(_))
    }
}
