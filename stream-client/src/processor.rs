//! The stream processor.
//!
//! Opens the event stream, keeps the feature store in step with it, and
//! reports readiness and errors through [`StreamSignals`].

use std::sync::Arc;

use flagstream_core::{Command, Effect, ProcessorState};
use thiserror::Error;
use tokio::sync::{oneshot, watch, Mutex};

use crate::config::StreamConfig;
use crate::listener::Listener;
use crate::notifier::{self, StreamSignals};
use crate::requestor::Requestor;
use crate::store::FeatureStore;
use crate::sync::Synchronizer;
use crate::transport::{Transport, TransportError};

/// Processor errors.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// `start` was called while already started.
    #[error("stream processor already started")]
    AlreadyStarted,

    /// Closing the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The listener task panicked.
    #[error("listener task failed: {0}")]
    ListenerPanicked(String),
}

struct ListenerHandle {
    shutdown: oneshot::Sender<()>,
    // Flips to true once the listener and all its fetches are done
    exited: watch::Receiver<bool>,
}

async fn wait_exited(mut exited: watch::Receiver<bool>) -> Result<(), ProcessorError> {
    exited
        .wait_for(|done| *done)
        .await
        .map(|_| ())
        .map_err(|_| ProcessorError::ListenerPanicked("listener exited without finishing".into()))
}

#[derive(Default)]
struct Lifecycle {
    state: ProcessorState,
    listener: Option<ListenerHandle>,
}

/// Keeps a [`FeatureStore`] synchronized with a flag stream.
///
/// Dropping the processor stops its listener and any in-flight fetches,
/// but only [`StreamProcessor::stop`] closes the transport.
pub struct StreamProcessor<T, R, S> {
    config: StreamConfig,
    transport: Arc<T>,
    requestor: Arc<R>,
    store: Arc<S>,
    lifecycle: Mutex<Lifecycle>,
}

impl<T, R, S> StreamProcessor<T, R, S>
where
    T: Transport + 'static,
    R: Requestor + 'static,
    S: FeatureStore + 'static,
{
    /// Create a processor. Nothing is opened until [`StreamProcessor::start`].
    pub fn new(config: StreamConfig, transport: T, requestor: R, store: Arc<S>) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            requestor: Arc::new(requestor),
            store,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Open the stream and start applying events.
    ///
    /// Returns the signals for this run: readiness after the first full
    /// flag set lands, and every error reported afterwards.
    pub async fn start(&self) -> Result<StreamSignals, ProcessorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let (state, effect) = lifecycle.state.on_command(Command::Start);
        lifecycle.state = state;
        if effect != Effect::OpenStream {
            tracing::warn!("Ignoring start: stream processor already started");
            return Err(ProcessorError::AlreadyStarted);
        }

        let request = self.config.stream_request();
        tracing::info!("Starting stream processor for {}", request.url);

        let (notifier, signals) = notifier::channel();
        let sync = Arc::new(Synchronizer::new(Arc::clone(&self.store), notifier));
        let listener = Listener::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.requestor),
            sync,
            request,
        );

        let (shutdown, shutdown_rx) = oneshot::channel();
        let (exited_tx, exited) = watch::channel(false);
        tokio::spawn(async move {
            listener.run(shutdown_rx).await;
            exited_tx.send_replace(true);
        });
        lifecycle.listener = Some(ListenerHandle { shutdown, exited });

        Ok(signals)
    }

    /// Stop the listener, cancel in-flight fetches and close the transport.
    ///
    /// Once this returns, nothing from this run touches the store again.
    /// A no-op when not started.
    pub async fn stop(&self) -> Result<(), ProcessorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let (state, effect) = lifecycle.state.on_command(Command::Stop);
        lifecycle.state = state;
        if effect != Effect::CloseStream {
            return Ok(());
        }

        if let Some(listener) = lifecycle.listener.take() {
            // Listener may already have ended on its own
            let _ = listener.shutdown.send(());
            wait_exited(listener.exited).await?;
        }

        self.transport.close().await?;
        tracing::info!("Stream processor stopped");
        Ok(())
    }

    /// Alias of [`StreamProcessor::stop`].
    pub async fn close(&self) -> Result<(), ProcessorError> {
        self.stop().await
    }

    /// Wait for the listener to finish: the stream ended and every
    /// outstanding fetch resolved, or the processor was stopped.
    pub async fn join(&self) -> Result<(), ProcessorError> {
        let exited = {
            let lifecycle = self.lifecycle.lock().await;
            lifecycle
                .listener
                .as_ref()
                .map(|listener| listener.exited.clone())
        };
        match exited {
            Some(exited) => wait_exited(exited).await,
            None => Ok(()),
        }
    }

    /// Check if started.
    pub async fn is_started(&self) -> bool {
        self.lifecycle.lock().await.state.is_started()
    }

    /// The store being kept synchronized.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a reference to the underlying requestor (for testing).
    pub fn requestor(&self) -> &R {
        &self.requestor
    }

    /// The configuration this processor was built with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
