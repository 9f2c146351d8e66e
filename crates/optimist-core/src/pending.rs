// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bookkeeping for in-flight mutations.

use crate::cache::{CacheEntry, WriteStamp};
use optimist_proto::{Args, MutationRef, MutationSeq, QueryKey, Value};

/// Where a mutation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Optimistic patch written, awaiting the server.
    Applied,
    /// Server accepted the mutation.
    Confirmed,
    /// Server rejected the mutation; the patch was reverted where still current.
    RolledBack,
}

/// One cache write performed by an optimistic patch.
///
/// `prior`/`prior_stamp` describe the slot immediately before the write;
/// `stamp` is the stamp the write produced. Rollback restores `prior` only if
/// the slot still carries `stamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchWrite {
    /// Key the patch rewrote.
    pub key: QueryKey,
    /// Predicted value written.
    pub value: Value,
    /// Entry held before the write.
    pub prior: CacheEntry,
    /// Stamp the slot carried before the write.
    pub prior_stamp: WriteStamp,
    /// Stamp produced by the write.
    pub stamp: WriteStamp,
}

/// An invoked mutation that has not been settled yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Invocation sequence number.
    pub seq: MutationSeq,
    /// Mutation function called.
    pub mutation: MutationRef,
    /// Arguments it was called with.
    pub args: Args,
    /// Lifecycle status.
    pub status: MutationStatus,
    /// Writes the optimistic patch performed, in order.
    pub writes: Vec<PatchWrite>,
}

impl PendingMutation {
    /// Keys touched by the optimistic patch.
    pub fn touched(&self) -> impl Iterator<Item = &QueryKey> {
        self.writes.iter().map(|w| &w.key)
    }
}
