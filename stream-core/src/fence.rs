//! Sequence fence for out-of-band full-set fetches.
//!
//! An `indirect/put` fetch resolves asynchronously, while later events
//! keep being applied. Without a fence, the fetched set would silently
//! overwrite patches and deletes that arrived in the meantime.
//!
//! Every dispatched event carries a sequence number. While at least one
//! full-set fetch is in flight, incremental mutations are journaled. When
//! a fetch resolves:
//! - if a full replacement with a later sequence was already applied, the
//!   fetched set is stale and is discarded;
//! - otherwise it is applied and every journaled mutation received after
//!   the trigger is replayed on top, in receipt order.
//!
//! Single-flag fetches need no fence: the store's per-key version rule
//! already discards results older than what it holds.

use std::collections::BTreeSet;

use flagstream_types::{DeleteInstruction, FlagPatch};

/// An incremental store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Upsert one flag.
    Upsert(FlagPatch),
    /// Delete one flag.
    Delete(DeleteInstruction),
}

/// Outcome of a resolved full-set fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FenceDecision {
    /// Apply the fetched set, then replay these mutations in order.
    Apply {
        /// Mutations received after the fetch was triggered.
        replay: Vec<Mutation>,
    },
    /// Drop the fetched set; a newer full replacement is already applied.
    Discard {
        /// Sequence of the replacement that superseded the fetch.
        superseded_by: u64,
    },
}

/// Sequence fence - NO I/O, just bookkeeping.
#[derive(Debug, Default)]
pub struct ReplaceFence {
    last_replace: u64,
    pending: BTreeSet<u64>,
    journal: Vec<(u64, Mutation)>,
}

impl ReplaceFence {
    /// Create an empty fence.
    pub fn new() -> Self {
        Self::default()
    }

    /// A full-set fetch was triggered by event `seq`.
    pub fn begin_fetch(&mut self, seq: u64) {
        self.pending.insert(seq);
    }

    /// An incremental mutation from event `seq` is being applied.
    ///
    /// Returns true if it was journaled (a fetch is in flight).
    pub fn record(&mut self, seq: u64, mutation: &Mutation) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.journal.push((seq, mutation.clone()));
        true
    }

    /// A full set from inline event `seq` was applied.
    pub fn replaced(&mut self, seq: u64) {
        self.last_replace = self.last_replace.max(seq);
        self.prune();
    }

    /// The fetch triggered by event `seq` resolved with a decodable set.
    pub fn complete_fetch(&mut self, seq: u64) -> FenceDecision {
        self.pending.remove(&seq);

        let decision = if seq < self.last_replace {
            FenceDecision::Discard {
                superseded_by: self.last_replace,
            }
        } else {
            self.last_replace = seq;
            let replay = self
                .journal
                .iter()
                .filter(|(received, _)| *received > seq)
                .map(|(_, mutation)| mutation.clone())
                .collect();
            FenceDecision::Apply { replay }
        };

        self.prune();
        decision
    }

    /// The fetch triggered by event `seq` failed or was undecodable.
    pub fn abandon_fetch(&mut self, seq: u64) {
        self.pending.remove(&seq);
        self.prune();
    }

    /// Number of full-set fetches in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Number of journaled mutations.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // Only mutations newer than the oldest pending trigger can ever be replayed.
    fn prune(&mut self) {
        match self.pending.first() {
            None => self.journal.clear(),
            Some(&oldest) => self.journal.retain(|(received, _)| *received > oldest),
        }
    }
}
