//! Listener task.
//!
//! Owns the receive loop: one event at a time, in transport order.
//! Indirect events spawn their fetch into a [`JoinSet`] owned by the
//! loop, so the next event can be handled while the fetch is in flight
//! and stopping the listener cancels every outstanding fetch with it.

use std::sync::Arc;

use flagstream_core::{on_all_fetched, on_event, on_flag_fetched, Action, Mutation};
use flagstream_types::{EventKind, RawEvent};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};

use crate::requestor::Requestor;
use crate::store::FeatureStore;
use crate::sync::Synchronizer;
use crate::transport::{StreamRequest, Transport};

pub(crate) struct Listener<T, R, S> {
    transport: Arc<T>,
    requestor: Arc<R>,
    sync: Arc<Synchronizer<S>>,
    request: StreamRequest,
}

impl<T, R, S> Listener<T, R, S>
where
    T: Transport + 'static,
    R: Requestor + 'static,
    S: FeatureStore + 'static,
{
    pub(crate) fn new(
        transport: Arc<T>,
        requestor: Arc<R>,
        sync: Arc<Synchronizer<S>>,
        request: StreamRequest,
    ) -> Self {
        Self {
            transport,
            requestor,
            sync,
            request,
        }
    }

    /// Run until the stream ends or `shutdown` fires (or its sender drops).
    ///
    /// When this returns after a shutdown, no fetch task is left running.
    pub(crate) async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let connected = tokio::select! {
            biased;
            _ = &mut shutdown => return,
            result = self.transport.connect(&self.request) => result,
        };
        if let Err(e) = connected {
            tracing::warn!("Failed to open stream {}: {}", self.request.url, e);
            self.sync.report(e.into());
            return;
        }
        tracing::info!("Connected to {}", self.request.url);

        let mut fetches = JoinSet::new();
        if self.receive(&mut shutdown, &mut fetches).await {
            fetches.shutdown().await;
            return;
        }

        // Stream ended; let outstanding fetches land unless told to stop
        tokio::select! {
            biased;
            _ = &mut shutdown => fetches.shutdown().await,
            _ = drain(&mut fetches) => {}
        }
    }

    /// Receive loop. Returns true if stopped by `shutdown`.
    async fn receive(
        &self,
        shutdown: &mut oneshot::Receiver<()>,
        fetches: &mut JoinSet<()>,
    ) -> bool {
        let mut seq = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut *shutdown => return true,
                received = self.transport.recv() => match received {
                    Ok(raw) => {
                        seq += 1;
                        self.dispatch(seq, raw, fetches).await;
                    }
                    Err(e) if e.is_terminal() => {
                        tracing::info!("Stream ended: {}", e);
                        return false;
                    }
                    Err(e) => self.sync.report(e.into()),
                },
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    if let Err(e) = joined {
                        log_join_error(e);
                    }
                }
            }
        }
    }

    async fn dispatch(&self, seq: u64, raw: RawEvent, fetches: &mut JoinSet<()>) {
        let name = raw.name.clone();
        let Some(event) = raw.recognize() else {
            tracing::warn!("Ignoring unknown event {}", name);
            return;
        };
        tracing::debug!("Received {} event", event.kind);

        match on_event(&event) {
            Action::ReplaceAll(flags) => self.sync.replace_all(seq, flags).await,
            Action::Upsert(patch) => self.sync.mutate(seq, Mutation::Upsert(patch)).await,
            Action::Delete(delete) => self.sync.mutate(seq, Mutation::Delete(delete)).await,
            Action::FetchAll => {
                self.sync.begin_fetch(seq).await;
                let requestor = Arc::clone(&self.requestor);
                let sync = Arc::clone(&self.sync);
                fetches.spawn(async move {
                    let fetched = requestor
                        .request_all_flags()
                        .await
                        .map_err(|e| e.into_stream_error(EventKind::IndirectPut));
                    match on_all_fetched(&event, fetched) {
                        Ok(flags) => sync.replace_fetched(seq, flags).await,
                        Err(err) => {
                            sync.abandon_fetch(seq).await;
                            sync.report(err);
                        }
                    }
                });
            }
            Action::FetchFlag { key } => {
                tracing::debug!("Requesting flag {}", key);
                let requestor = Arc::clone(&self.requestor);
                let sync = Arc::clone(&self.sync);
                fetches.spawn(async move {
                    let fetched = requestor
                        .request_flag(&key)
                        .await
                        .map_err(|e| e.into_stream_error(EventKind::IndirectPatch));
                    match on_flag_fetched(&event, &key, fetched) {
                        Ok(patch) => sync.mutate(seq, Mutation::Upsert(patch)).await,
                        Err(err) => sync.report(err),
                    }
                });
            }
            Action::Report(err) => self.sync.report(err),
        }
    }
}

async fn drain(fetches: &mut JoinSet<()>) {
    while let Some(joined) = fetches.join_next().await {
        if let Err(e) = joined {
            log_join_error(e);
        }
    }
}

fn log_join_error(e: JoinError) {
    if e.is_panic() {
        tracing::error!("Flag fetch task panicked: {}", e);
    }
}
