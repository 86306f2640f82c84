//! Readiness and error signalling.
//!
//! The processor reports two things to its owner: that the store has
//! been initialized (once), and errors (any number of times). They
//! travel on separate channels so neither can be mistaken for the other.

use std::sync::{Arc, Mutex, PoisonError};

use flagstream_types::StreamError;
use tokio::sync::{mpsc, oneshot};

/// Create a connected notifier / signals pair.
pub fn channel() -> (Notifier, StreamSignals) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    let notifier = Notifier {
        ready: Arc::new(Mutex::new(Some(ready_tx))),
        errors: error_tx,
    };
    let signals = StreamSignals {
        ready: Some(ready_rx),
        is_ready: false,
        errors: error_rx,
    };
    (notifier, signals)
}

/// Sending side, held by the listener and its fetch tasks.
#[derive(Debug, Clone)]
pub struct Notifier {
    ready: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    errors: mpsc::UnboundedSender<StreamError>,
}

impl Notifier {
    /// Signal readiness. Only the first call has any effect.
    pub fn ready(&self) {
        let sender = self
            .ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            tracing::info!("Flag store initialized");
            // Receiver may already be gone; readiness is then nobody's concern
            let _ = sender.send(());
        }
    }

    /// Report an error to the owner.
    pub fn error(&self, err: StreamError) {
        tracing::warn!("Stream error: {}", err);
        let _ = self.errors.send(err);
    }
}

/// Receiving side, returned by `StreamProcessor::start`.
#[derive(Debug)]
pub struct StreamSignals {
    ready: Option<oneshot::Receiver<()>>,
    is_ready: bool,
    errors: mpsc::UnboundedReceiver<StreamError>,
}

enum Outcome {
    Ready,
    Closed,
    Error(StreamError),
}

impl StreamSignals {
    /// Wait until the store is initialized.
    ///
    /// Returns `true` on readiness, `false` if the processor went away
    /// without ever becoming ready.
    pub async fn ready(&mut self) -> bool {
        if self.is_ready {
            return true;
        }
        let Some(ready) = self.ready.take() else {
            return false;
        };
        self.is_ready = ready.await.is_ok();
        self.is_ready
    }

    /// Whether readiness has been observed.
    pub fn is_ready(&mut self) -> bool {
        if !self.is_ready {
            if let Some(ready) = self.ready.as_mut() {
                match ready.try_recv() {
                    Ok(()) => {
                        self.is_ready = true;
                        self.ready = None;
                    }
                    Err(oneshot::error::TryRecvError::Closed) => self.ready = None,
                    Err(oneshot::error::TryRecvError::Empty) => {}
                }
            }
        }
        self.is_ready
    }

    /// Next reported error; `None` once the processor and all its tasks
    /// are gone.
    pub async fn next_error(&mut self) -> Option<StreamError> {
        self.errors.recv().await
    }

    /// Next reported error, if one is already queued.
    pub fn try_next_error(&mut self) -> Option<StreamError> {
        self.errors.try_recv().ok()
    }

    /// Wait for readiness or the first error, whichever comes first.
    pub async fn wait_ready(&mut self) -> Result<(), StreamError> {
        if self.is_ready() {
            return Ok(());
        }

        let outcome = match self.ready.as_mut() {
            Some(ready) => {
                tokio::select! {
                    biased;
                    result = ready => match result {
                        Ok(()) => Outcome::Ready,
                        Err(_) => Outcome::Closed,
                    },
                    Some(err) = self.errors.recv() => Outcome::Error(err),
                }
            }
            None => Outcome::Closed,
        };

        match outcome {
            Outcome::Ready => {
                self.is_ready = true;
                self.ready = None;
                Ok(())
            }
            Outcome::Error(err) => Err(err),
            Outcome::Closed => {
                self.ready = None;
                // The listener may have reported why it went away
                if let Ok(err) = self.errors.try_recv() {
                    return Err(err);
                }
                Err(StreamError::transport(
                    "stream closed before flags were initialized",
                    None,
                ))
            }
        }
    }
}
