//! Store synchronizer.
//!
//! Applies decoded actions to the feature store. All writes take the
//! fence lock, so a fetched full set plus its journal replay lands
//! atomically with respect to live events.

use std::sync::Arc;

use flagstream_core::{FenceDecision, Mutation, ReplaceFence};
use flagstream_types::{FlagSet, StreamError};
use tokio::sync::Mutex;

use crate::notifier::Notifier;
use crate::store::FeatureStore;

/// Writes to the store on behalf of the listener and its fetch tasks.
pub(crate) struct Synchronizer<S> {
    store: Arc<S>,
    fence: Mutex<ReplaceFence>,
    notifier: Notifier,
}

impl<S: FeatureStore> Synchronizer<S> {
    pub(crate) fn new(store: Arc<S>, notifier: Notifier) -> Self {
        Self {
            store,
            fence: Mutex::new(ReplaceFence::new()),
            notifier,
        }
    }

    /// Replace everything with an inline `put` set, then signal readiness.
    pub(crate) async fn replace_all(&self, seq: u64, flags: FlagSet) {
        let mut fence = self.fence.lock().await;
        tracing::debug!("Replacing store with {} flags", flags.len());
        self.store.init(flags).await;
        fence.replaced(seq);
        drop(fence);
        self.notifier.ready();
    }

    /// Apply an incremental mutation from event `seq`.
    pub(crate) async fn mutate(&self, seq: u64, mutation: Mutation) {
        let mut fence = self.fence.lock().await;
        fence.record(seq, &mutation);
        self.apply(mutation).await;
    }

    /// A full-set fetch was triggered by event `seq`.
    pub(crate) async fn begin_fetch(&self, seq: u64) {
        self.fence.lock().await.begin_fetch(seq);
    }

    /// The fetch triggered by `seq` produced a set.
    pub(crate) async fn replace_fetched(&self, seq: u64, flags: FlagSet) {
        let mut fence = self.fence.lock().await;
        match fence.complete_fetch(seq) {
            FenceDecision::Apply { replay } => {
                tracing::debug!(
                    "Replacing store with {} fetched flags, replaying {} mutations",
                    flags.len(),
                    replay.len()
                );
                self.store.init(flags).await;
                for mutation in replay {
                    self.apply(mutation).await;
                }
                drop(fence);
                self.notifier.ready();
            }
            FenceDecision::Discard { superseded_by } => {
                tracing::debug!(
                    "Discarding flags fetched for event {}, superseded by event {}",
                    seq,
                    superseded_by
                );
            }
        }
    }

    /// The fetch triggered by `seq` failed.
    pub(crate) async fn abandon_fetch(&self, seq: u64) {
        self.fence.lock().await.abandon_fetch(seq);
    }

    /// Report an error to the owner.
    pub(crate) fn report(&self, err: StreamError) {
        self.notifier.error(err);
    }

    async fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::Upsert(patch) => self.store.upsert(&patch.key, patch.definition).await,
            Mutation::Delete(delete) => self.store.delete(&delete.key, delete.version).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier;
    use crate::store::InMemoryFeatureStore;
    use flagstream_types::{DeleteInstruction, FlagDefinition, FlagPatch};

    fn setup() -> (
        Synchronizer<InMemoryFeatureStore>,
        Arc<InMemoryFeatureStore>,
        notifier::StreamSignals,
    ) {
        let store = Arc::new(InMemoryFeatureStore::new());
        let (notifier, signals) = notifier::channel();
        (Synchronizer::new(Arc::clone(&store), notifier), store, signals)
    }

    fn set(flags: &[(&str, u64)]) -> FlagSet {
        flags
            .iter()
            .map(|(key, version)| (key.to_string(), FlagDefinition::new(*version)))
            .collect()
    }

    fn upsert(key: &str, version: u64) -> Mutation {
        Mutation::Upsert(FlagPatch {
            key: key.into(),
            definition: FlagDefinition::new(version),
        })
    }

    #[tokio::test]
    async fn replace_all_initializes_and_signals_ready() {
        let (sync, store, mut signals) = setup();
        sync.replace_all(1, set(&[("a", 1)])).await;

        assert!(store.initialized().await);
        assert!(signals.is_ready());
    }

    #[tokio::test]
    async fn fetched_set_keeps_later_mutations() {
        let (sync, store, mut signals) = setup();
        sync.begin_fetch(1).await;
        sync.mutate(2, upsert("a", 7)).await;
        sync.mutate(
            3,
            Mutation::Delete(DeleteInstruction {
                key: "b".into(),
                version: 9,
            }),
        )
        .await;

        sync.replace_fetched(1, set(&[("a", 1), ("b", 1)])).await;

        assert_eq!(store.get("a").await.unwrap().version, 7);
        assert!(store.get("b").await.is_none());
        assert!(signals.is_ready());
    }

    #[tokio::test]
    async fn superseded_fetch_is_dropped() {
        let (sync, store, _signals) = setup();
        sync.begin_fetch(1).await;
        sync.replace_all(2, set(&[("fresh", 1)])).await;

        sync.replace_fetched(1, set(&[("stale", 1)])).await;

        assert_eq!(store.init_count(), 1);
        assert!(store.get("fresh").await.is_some());
        assert!(store.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn abandoned_fetch_leaves_store_untouched() {
        let (sync, store, mut signals) = setup();
        sync.begin_fetch(1).await;
        sync.abandon_fetch(1).await;

        assert!(!store.initialized().await);
        assert!(!signals.is_ready());
    }
}
