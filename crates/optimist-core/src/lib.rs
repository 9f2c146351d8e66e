// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client-side optimistic update layer for reactive backends.
//!
//! Three cooperating parts, all single-threaded and synchronous:
//!
//! - [`QueryCache`] holds the latest value per [`QueryKey`](optimist_proto::QueryKey)
//!   and notifies listeners on every write.
//! - [`PatchEngine`] applies a caller's [`OptimisticPatch`] the moment a
//!   mutation is invoked and records it as a [`PendingMutation`].
//! - [`Reconciler`] applies server pushes (always winning) and settles
//!   mutations in sequence order, rolling back rejected patches only where
//!   no newer write owns the key.
//!
//! Networking is not part of this crate; see `optimist-client`.
#![forbid(unsafe_code)]

mod cache;
mod patch;
mod pending;
mod reconcile;

pub use cache::{CacheEntry, Lifecycle, Listener, QueryCache, Subscription, WriteStamp};
pub use patch::{
    patch_fn, NoPatch, OptimisticPatch, PatchContext, PatchEngine, PatchError, PatchWrites,
};
pub use pending::{MutationStatus, PatchWrite, PendingMutation};
pub use reconcile::{Reconciler, Resolution, Settled};
