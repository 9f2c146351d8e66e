// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reconciler: brings the cache back to server truth.
//!
//! # Ordering
//!
//! Server pushes apply the moment they arrive and always overwrite.
//! Mutation resolutions may arrive in any order but are applied strictly in
//! sequence order: a resolution for `#5` is held until `#1..#4` have settled.
//!
//! # Rollback
//!
//! A rejected mutation reverts each key it wrote only if the key still carries
//! the stamp that write produced. Otherwise something newer (a later patch or a
//! server push) owns the key and the rollback is suppressed for it. When the
//! newer owner is a still-pending patch computed directly on top of the
//! rejected write, that patch inherits the rejected write's baseline, so its
//! own rollback later lands on pre-rejection state.

use crate::cache::{CacheEntry, QueryCache, WriteStamp};
use crate::patch::PatchEngine;
use crate::pending::{MutationStatus, PendingMutation};
use optimist_proto::{Args, MutationRef, MutationSeq, QueryKey};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How the server resolved a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Mutation persisted.
    Confirm,
    /// Mutation rejected.
    Reject,
}

/// A mutation whose resolution has been applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    /// Sequence number.
    pub seq: MutationSeq,
    /// Mutation function.
    pub mutation: MutationRef,
    /// Arguments it was invoked with.
    pub args: Args,
    /// `Confirmed` or `RolledBack`.
    pub status: MutationStatus,
    /// Keys reverted to their pre-patch value.
    pub restored: Vec<QueryKey>,
    /// Keys left alone because newer data owned them.
    pub suppressed: Vec<QueryKey>,
}

/// Applies server pushes and in-order mutation resolutions.
#[derive(Debug, Default)]
pub struct Reconciler {
    held: BTreeMap<MutationSeq, Resolution>,
}

impl Reconciler {
    /// Create a reconciler with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an authoritative push. Server data always wins over optimistic
    /// state.
    pub fn apply_push(
        &mut self,
        cache: &mut QueryCache,
        key: &QueryKey,
        entry: impl Into<CacheEntry>,
    ) -> Option<WriteStamp> {
        let stamp = cache.set(key, entry);
        if stamp.is_some() {
            debug!(key = %key, "authoritative push applied");
        }
        stamp
    }

    /// Record the server's resolution of `seq` and apply every resolution that
    /// is now at the head of the sequence.
    ///
    /// Unknown or already-recorded sequence numbers are ignored, so each
    /// resolution takes effect at most once.
    pub fn resolve(
        &mut self,
        cache: &mut QueryCache,
        engine: &mut PatchEngine,
        seq: MutationSeq,
        resolution: Resolution,
    ) -> Vec<Settled> {
        if !engine.is_pending(seq) || self.held.contains_key(&seq) {
            warn!(%seq, ?resolution, "ignoring resolution for unknown or settled mutation");
            return Vec::new();
        }
        self.held.insert(seq, resolution);
        if engine.oldest() != Some(seq) {
            debug!(%seq, held = self.held.len(), "resolution held behind older mutation");
        }

        let mut settled = Vec::new();
        while let Some(head) = engine.oldest() {
            let Some(resolution) = self.held.remove(&head) else {
                break;
            };
            let Some(pending) = engine.take(head) else {
                break;
            };
            settled.push(match resolution {
                Resolution::Confirm => confirm(pending),
                Resolution::Reject => roll_back(cache, engine, pending),
            });
        }
        settled
    }

    /// Number of resolutions waiting on older mutations.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

fn confirm(pending: PendingMutation) -> Settled {
    info!(seq = %pending.seq, mutation = %pending.mutation, "mutation confirmed");
    Settled {
        seq: pending.seq,
        mutation: pending.mutation,
        args: pending.args,
        status: MutationStatus::Confirmed,
        restored: Vec::new(),
        suppressed: Vec::new(),
    }
}

fn roll_back(
    cache: &mut QueryCache,
    engine: &mut PatchEngine,
    pending: PendingMutation,
) -> Settled {
    let mut restored = Vec::new();
    let mut suppressed = Vec::new();
    for write in &pending.writes {
        if cache.stamp_of(&write.key) == Some(write.stamp) {
            cache.set(&write.key, write.prior.clone());
            restored.push(write.key.clone());
        } else {
            if let Some(heir) = engine.inherit_baseline(write) {
                debug!(seq = %pending.seq, %heir, key = %write.key, "rollback baseline inherited");
            }
            suppressed.push(write.key.clone());
        }
    }
    warn!(
        seq = %pending.seq,
        mutation = %pending.mutation,
        restored = restored.len(),
        suppressed = suppressed.len(),
        "mutation rolled back"
    );
    Settled {
        seq: pending.seq,
        mutation: pending.mutation,
        args: pending.args,
        status: MutationStatus::RolledBack,
        restored,
        suppressed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::patch::{patch_fn, NoPatch, PatchError, PatchWrites};
    use crate::{PatchContext, Subscription};
    use optimist_proto::{QueryRef, Value};

    fn k() -> QueryKey {
        QueryKey::bare(QueryRef::new("counter", "get"))
    }

    fn bump() -> MutationRef {
        MutationRef::new("counter", "bump")
    }

    fn add(n: i64) -> impl Fn(&PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        patch_fn(move |ctx| {
            let cur = ctx.current(&k()).and_then(Value::as_i64).unwrap_or(0);
            Ok(vec![(k(), Value::Int(cur + n))])
        })
    }

    struct Rig {
        _sub: Subscription,
        cache: QueryCache,
        engine: PatchEngine,
        rec: Reconciler,
    }

    impl Rig {
        fn with_value(v: i64) -> Self {
            let mut cache = QueryCache::new();
            let sub = cache.subscribe(k(), |_, _| {});
            cache.set(&k(), Value::Int(v));
            Self {
                _sub: sub,
                cache,
                engine: PatchEngine::new(),
                rec: Reconciler::new(),
            }
        }

        fn invoke(&mut self, n: i64) -> MutationSeq {
            self.engine
                .invoke(&mut self.cache, bump(), Args::new(), &add(n))
                .unwrap()
        }

        fn resolve(&mut self, seq: MutationSeq, r: Resolution) -> Vec<Settled> {
            self.rec.resolve(&mut self.cache, &mut self.engine, seq, r)
        }

        fn value(&self) -> Option<i64> {
            self.cache.get(&k()).value().and_then(Value::as_i64)
        }
    }

    #[test]
    fn reject_restores_prior_value() {
        let mut rig = Rig::with_value(10);
        let seq = rig.invoke(5);
        assert_eq!(rig.value(), Some(15));
        let settled = rig.resolve(seq, Resolution::Reject);
        assert_eq!(rig.value(), Some(10));
        assert_eq!(settled[0].status, MutationStatus::RolledBack);
        assert_eq!(settled[0].restored, vec![k()]);
        assert_eq!(rig.engine.pending_count(), 0);
    }

    #[test]
    fn confirm_keeps_prediction_until_push() {
        let mut rig = Rig::with_value(10);
        let seq = rig.invoke(5);
        let settled = rig.resolve(seq, Resolution::Confirm);
        assert_eq!(settled[0].status, MutationStatus::Confirmed);
        assert_eq!(rig.value(), Some(15));
        rig.rec.apply_push(&mut rig.cache, &k(), Value::Int(16));
        assert_eq!(rig.value(), Some(16));
    }

    #[test]
    fn push_suppresses_rollback() {
        let mut rig = Rig::with_value(10);
        let seq = rig.invoke(5);
        rig.rec.apply_push(&mut rig.cache, &k(), Value::Int(42));
        let settled = rig.resolve(seq, Resolution::Reject);
        assert_eq!(rig.value(), Some(42));
        assert_eq!(settled[0].suppressed, vec![k()]);
    }

    #[test]
    fn out_of_order_resolutions_are_held() {
        let mut rig = Rig::with_value(0);
        let first = rig.invoke(1);
        let second = rig.invoke(2);
        assert!(rig.resolve(second, Resolution::Confirm).is_empty());
        assert_eq!(rig.rec.held_count(), 1);
        let settled = rig.resolve(first, Resolution::Confirm);
        let order: Vec<_> = settled.iter().map(|s| s.seq).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(rig.rec.held_count(), 0);
    }

    #[test]
    fn chained_failures_unwind_to_original_state() {
        let mut rig = Rig::with_value(0);
        let first = rig.invoke(1);
        let second = rig.invoke(10);
        assert_eq!(rig.value(), Some(11));
        // Later failure arrives first; it waits for the older one.
        assert!(rig.resolve(second, Resolution::Reject).is_empty());
        let settled = rig.resolve(first, Resolution::Reject);
        assert_eq!(settled.len(), 2);
        assert_eq!(settled[0].suppressed, vec![k()]);
        assert_eq!(settled[1].restored, vec![k()]);
        assert_eq!(rig.value(), Some(0));
    }

    #[test]
    fn earlier_failure_is_dropped_from_later_baseline() {
        let mut rig = Rig::with_value(0);
        let first = rig.invoke(1);
        let second = rig.invoke(10);
        rig.resolve(first, Resolution::Reject);
        // Still showing the second prediction, which was stacked on the first.
        assert_eq!(rig.value(), Some(11));
        rig.resolve(second, Resolution::Reject);
        assert_eq!(rig.value(), Some(0));
    }

    #[test]
    fn baseline_is_not_inherited_across_a_push() {
        let mut rig = Rig::with_value(0);
        let first = rig.invoke(1);
        rig.rec.apply_push(&mut rig.cache, &k(), Value::Int(100));
        let second = rig.invoke(10);
        rig.resolve(first, Resolution::Reject);
        rig.resolve(second, Resolution::Reject);
        assert_eq!(rig.value(), Some(100));
    }

    #[test]
    fn duplicate_and_unknown_resolutions_are_ignored() {
        let mut rig = Rig::with_value(1);
        let seq = rig.invoke(1);
        assert_eq!(rig.resolve(seq, Resolution::Confirm).len(), 1);
        assert!(rig.resolve(seq, Resolution::Reject).is_empty());
        assert!(rig.resolve(MutationSeq(99), Resolution::Reject).is_empty());
        assert_eq!(rig.value(), Some(2));
    }

    #[test]
    fn resolving_patchless_mutation_settles_without_writes() {
        let mut rig = Rig::with_value(1);
        let seq = rig
            .engine
            .invoke(&mut rig.cache, bump(), Args::new(), &NoPatch)
            .unwrap();
        let settled = rig.resolve(seq, Resolution::Reject);
        assert!(settled[0].restored.is_empty() && settled[0].suppressed.is_empty());
        assert_eq!(rig.value(), Some(1));
    }
}
