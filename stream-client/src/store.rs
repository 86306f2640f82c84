//! Local flag store.
//!
//! This module provides the contract the processor writes through, plus
//! a memory-based implementation.
//!
//! Version ordering is the store's job: `upsert` and `delete` only take
//! effect when they are newer than what is held for the key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use flagstream_types::{FlagDefinition, FlagSet};

/// Trait for the store the processor keeps synchronized.
///
/// Implementations must tolerate overlapping calls; the processor adds no
/// locking of its own around reads.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Replace the entire contents. Resolves once the new set is durable.
    async fn init(&self, flags: FlagSet);

    /// Store `definition` under `key` if its version is newer than the
    /// stored one (or nothing is stored).
    async fn upsert(&self, key: &str, definition: FlagDefinition);

    /// Remove `key` if nothing is stored or the stored version is older
    /// than `version`.
    async fn delete(&self, key: &str, version: u64);

    /// Get a live (non-deleted) flag.
    async fn get(&self, key: &str) -> Option<FlagDefinition>;

    /// All live flags.
    async fn all(&self) -> FlagSet;

    /// Whether `init` has completed at least once.
    async fn initialized(&self) -> bool;
}

#[derive(Debug, Default)]
struct StoreInner {
    flags: HashMap<String, FlagDefinition>,
    initialized: bool,
    init_count: usize,
}

/// In-memory feature store.
///
/// Deleted flags are kept as tombstones carrying the delete's version, so
/// a stale upsert arriving later cannot bring them back.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFeatureStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryFeatureStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live flags.
    pub fn len(&self) -> usize {
        self.lock().flags.values().filter(|def| !def.deleted).count()
    }

    /// Check if the store holds no live flags.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of completed `init` calls.
    pub fn init_count(&self) -> usize {
        self.lock().init_count
    }

    /// Version held for `key`, counting tombstones.
    pub fn version_of(&self, key: &str) -> Option<u64> {
        self.lock().flags.get(key).map(|def| def.version)
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_if_newer(&self, key: &str, definition: FlagDefinition) -> bool {
        let mut inner = self.lock();
        match inner.flags.get(key) {
            Some(current) if current.version >= definition.version => false,
            _ => {
                inner.flags.insert(key.to_string(), definition);
                true
            }
        }
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    async fn init(&self, flags: FlagSet) {
        let mut inner = self.lock();
        inner.flags = flags.into_iter().collect();
        inner.initialized = true;
        inner.init_count += 1;
    }

    async fn upsert(&self, key: &str, definition: FlagDefinition) {
        let version = definition.version;
        if !self.write_if_newer(key, definition) {
            tracing::debug!("Ignoring stale upsert of {} at version {}", key, version);
        }
    }

    async fn delete(&self, key: &str, version: u64) {
        if !self.write_if_newer(key, FlagDefinition::tombstone(key, version)) {
            tracing::debug!("Ignoring stale delete of {} at version {}", key, version);
        }
    }

    async fn get(&self, key: &str) -> Option<FlagDefinition> {
        self.lock()
            .flags
            .get(key)
            .filter(|def| !def.deleted)
            .cloned()
    }

    async fn all(&self) -> FlagSet {
        self.lock()
            .flags
            .iter()
            .filter(|(_, def)| !def.deleted)
            .map(|(key, def)| (key.clone(), def.clone()))
            .collect()
    }

    async fn initialized(&self) -> bool {
        self.lock().initialized
    }
}
