//! Mock requestor for testing.
//!
//! Serves canned bodies, records what was asked for, and can hold
//! requests in flight until released.

use super::{FetchError, Requestor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
    Failure(String),
}

impl Canned {
    fn respond(self) -> Result<String, FetchError> {
        match self {
            Self::Body(body) => Ok(body),
            Self::Status(status) => Err(FetchError::Status { status }),
            Self::Failure(error) => Err(FetchError::Request(error)),
        }
    }
}

#[derive(Debug, Default)]
struct MockRequestorInner {
    all_flags: Option<Canned>,
    flags: HashMap<String, Canned>,
    all_flags_requests: usize,
    flag_requests: Vec<String>,
}

/// Mock requestor for testing.
///
/// Unconfigured requests answer with HTTP 404.
#[derive(Debug)]
pub struct MockRequestor {
    inner: Arc<Mutex<MockRequestorInner>>,
    gate: Arc<watch::Sender<bool>>,
}

impl MockRequestor {
    /// Create a new mock requestor with the gate open.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::default(),
            gate: Arc::new(gate),
        }
    }

    /// Body returned by `request_all_flags()`.
    pub fn set_all_flags(&self, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.all_flags = Some(Canned::Body(body.to_string()));
    }

    /// Make `request_all_flags()` fail with an HTTP status.
    pub fn fail_all_flags(&self, status: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.all_flags = Some(Canned::Status(status));
    }

    /// Body returned by `request_flag(key)`.
    pub fn set_flag(&self, key: &str, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .flags
            .insert(key.to_string(), Canned::Body(body.to_string()));
    }

    /// Make `request_flag(key)` fail without a status (e.g. timeout).
    pub fn fail_flag(&self, key: &str, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .flags
            .insert(key.to_string(), Canned::Failure(error.to_string()));
    }

    /// Hold every request until [`MockRequestor::release`].
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future requests complete.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Number of `request_all_flags()` calls so far.
    pub fn all_flags_requests(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.all_flags_requests
    }

    /// Keys passed to `request_flag()`, in call order.
    pub fn flag_requests(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.flag_requests.clone()
    }

    async fn wait_for_gate(&self) {
        let mut open = self.gate.subscribe();
        // The sender lives as long as self, so this only fails on drop
        let _ = open.wait_for(|open| *open).await;
    }
}

impl Default for MockRequestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockRequestor {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            gate: Arc::clone(&self.gate),
        }
    }
}

#[async_trait]
impl Requestor for MockRequestor {
    async fn request_all_flags(&self) -> Result<String, FetchError> {
        let canned = {
            let mut inner = self.inner.lock().unwrap();
            inner.all_flags_requests += 1;
            inner.all_flags.clone()
        };
        self.wait_for_gate().await;
        canned.unwrap_or(Canned::Status(404)).respond()
    }

    async fn request_flag(&self, key: &str) -> Result<String, FetchError> {
        let canned = {
            let mut inner = self.inner.lock().unwrap();
            inner.flag_requests.push(key.to_string());
            inner.flags.get(key).cloned()
        };
        self.wait_for_gate().await;
        canned.unwrap_or(Canned::Status(404)).respond()
    }
}
