// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optimistic patch engine.
//!
//! A patch is a pure description: given the current cache contents and the
//! mutation arguments, it returns the `(QueryKey, Value)` pairs it wants to
//! write. The engine performs the writes through [`QueryCache::set`] and
//! records enough about each one (prior entry and stamps) to reverse it.

use crate::cache::{CacheEntry, QueryCache};
use crate::pending::{MutationStatus, PatchWrite, PendingMutation};
use optimist_proto::{Args, MutationRef, MutationSeq, QueryKey, Value};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Writes requested by a patch.
pub type PatchWrites = Vec<(QueryKey, Value)>;

/// Reasons a patch aborts an invocation. The cache is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The patch listed the same key twice.
    #[error("patch writes {0} more than once")]
    DuplicateKey(QueryKey),
    /// A cached value did not have the shape the patch expects.
    #[error("unexpected {found} cached for {key}, expected {expected}")]
    UnexpectedShape {
        /// Offending key.
        key: QueryKey,
        /// Shape the patch needs.
        expected: &'static str,
        /// Shape actually cached.
        found: &'static str,
    },
    /// The patch refused to predict for these arguments.
    #[error("patch rejected: {0}")]
    Rejected(String),
}

/// Read-only view handed to a patch.
pub struct PatchContext<'a> {
    /// Sequence number assigned to this invocation.
    pub seq: MutationSeq,
    /// Mutation being invoked.
    pub mutation: &'a MutationRef,
    /// Mutation arguments.
    pub args: &'a Args,
    cache: &'a QueryCache,
}

impl<'a> PatchContext<'a> {
    /// Cached entry for `key`, including earlier optimistic writes.
    pub fn get(&self, key: &QueryKey) -> &'a CacheEntry {
        self.cache.get(key)
    }

    /// Cached value for `key`, if one has arrived.
    pub fn current(&self, key: &QueryKey) -> Option<&'a Value> {
        self.cache.get(key).value()
    }

    /// Cached array for `key`. `Ok(None)` while the query is still loading.
    pub fn current_list(&self, key: &QueryKey) -> Result<Option<&'a [Value]>, PatchError> {
        match self.current(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(PatchError::UnexpectedShape {
                key: key.clone(),
                expected: "array",
                found: other.kind(),
            }),
        }
    }
}

/// A pure, synchronous prediction of a mutation's effect on cached queries.
pub trait OptimisticPatch {
    /// Compute the writes. Must not have side effects.
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError>;
}

impl<F> OptimisticPatch for F
where
    F: Fn(&PatchContext<'_>) -> Result<PatchWrites, PatchError>,
{
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        self(ctx)
    }
}

/// Pins a closure's signature so it can be passed as an [`OptimisticPatch`].
pub fn patch_fn<F>(f: F) -> F
where
    F: Fn(&PatchContext<'_>) -> Result<PatchWrites, PatchError>,
{
    f
}

/// Patch that predicts nothing (plain mutation without optimistic update).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPatch;

impl OptimisticPatch for NoPatch {
    fn predict(&self, _ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        Ok(Vec::new())
    }
}

/// Assigns sequence numbers, applies patches and keeps the pending ledger.
#[derive(Debug, Default)]
pub struct PatchEngine {
    last_seq: u64,
    pending: BTreeMap<MutationSeq, PendingMutation>,
}

impl PatchEngine {
    /// Create an engine with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `patch` for a new invocation of `mutation` and record it as
    /// pending.
    ///
    /// The sequence number is assigned before the patch runs, so patches may
    /// derive placeholder ids from it. A failing patch consumes its number and
    /// leaves the cache untouched. Writes to unsubscribed keys are skipped.
    pub fn invoke<P>(
        &mut self,
        cache: &mut QueryCache,
        mutation: MutationRef,
        args: Args,
        patch: &P,
    ) -> Result<MutationSeq, PatchError>
    where
        P: OptimisticPatch + ?Sized,
    {
        self.last_seq += 1;
        let seq = MutationSeq(self.last_seq);

        let requested = {
            let ctx = PatchContext {
                seq,
                mutation: &mutation,
                args: &args,
                cache: &*cache,
            };
            patch.predict(&ctx)?
        };
        let mut seen = HashSet::with_capacity(requested.len());
        for (key, _) in &requested {
            if !seen.insert(key) {
                return Err(PatchError::DuplicateKey(key.clone()));
            }
        }

        let mut writes = Vec::with_capacity(requested.len());
        for (key, value) in requested {
            let Some(prior_stamp) = cache.stamp_of(&key) else {
                debug!(%seq, key = %key, "patch skipped unsubscribed query");
                continue;
            };
            let prior = cache.get(&key).clone();
            if let Some(stamp) = cache.set(&key, value.clone()) {
                writes.push(PatchWrite {
                    key,
                    value,
                    prior,
                    prior_stamp,
                    stamp,
                });
            }
        }
        debug!(%seq, mutation = %mutation, writes = writes.len(), "optimistic patch applied");

        self.pending.insert(
            seq,
            PendingMutation {
                seq,
                mutation,
                args,
                status: MutationStatus::Applied,
                writes,
            },
        );
        Ok(seq)
    }

    /// Look up a pending mutation.
    pub fn pending(&self, seq: MutationSeq) -> Option<&PendingMutation> {
        self.pending.get(&seq)
    }

    /// Returns `true` while `seq` awaits settlement.
    pub fn is_pending(&self, seq: MutationSeq) -> bool {
        self.pending.contains_key(&seq)
    }

    /// Number of unsettled mutations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Unsettled mutations in sequence order.
    pub fn iter_pending(&self) -> impl Iterator<Item = &PendingMutation> {
        self.pending.values()
    }

    /// Oldest unsettled sequence number.
    pub(crate) fn oldest(&self) -> Option<MutationSeq> {
        self.pending.keys().next().copied()
    }

    pub(crate) fn take(&mut self, seq: MutationSeq) -> Option<PendingMutation> {
        self.pending.remove(&seq)
    }

    /// Hand a suppressed rollback's baseline to the pending patch that was
    /// computed directly on top of `write`.
    ///
    /// Returns the sequence number that inherited it, if any.
    pub(crate) fn inherit_baseline(&mut self, write: &PatchWrite) -> Option<MutationSeq> {
        for pending in self.pending.values_mut() {
            if pending.status != MutationStatus::Applied {
                continue;
            }
            if let Some(later) = pending
                .writes
                .iter_mut()
                .find(|w| w.key == write.key && w.prior_stamp == write.stamp)
            {
                later.prior = write.prior.clone();
                later.prior_stamp = write.prior_stamp;
                return Some(pending.seq);
            }
        }
        None
    }
}
