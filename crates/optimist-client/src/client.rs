// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The client: owns the cache, engine and reconciler, and wires them to the
//! backend port.

use crate::port::{Anonymous, Backend, EventStream, MutationCall, TokenSource};
use crate::ticket::MutationTicket;
use optimist_core::{
    CacheEntry, Lifecycle, MutationStatus, OptimisticPatch, PatchEngine, PatchError, QueryCache,
    Reconciler, Resolution, Settled, Subscription,
};
use optimist_proto::{
    Args, BackendEvent, MutationError, MutationRef, MutationSeq, QueryKey, Value,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

/// Errors returned synchronously by client calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The optimistic patch aborted; nothing was written or sent.
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// A settled mutation together with the rejection that caused a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledMutation {
    /// What the reconciler did.
    pub settled: Settled,
    /// Backend error for rolled-back mutations.
    pub error: Option<MutationError>,
}

impl SettledMutation {
    /// Returns `true` if the mutation was rolled back.
    pub fn is_rolled_back(&self) -> bool {
        self.settled.status == MutationStatus::RolledBack
    }
}

/// Optimistic query/mutation client.
///
/// Single-threaded: every method runs on the caller's thread, and backend
/// events are applied only when the owner calls [`pump`](Self::pump),
/// [`next_event`](Self::next_event) or [`handle_event`](Self::handle_event).
///
/// A backend subscription the transport refused is never retried on its own.
/// The entry stays [`CacheEntry::Failed`] until the owner calls
/// [`retry_subscription`](Self::retry_subscription) or every listener leaves.
pub struct OptimistClient<B, T = Anonymous> {
    cache: QueryCache,
    engine: PatchEngine,
    reconciler: Reconciler,
    backend: B,
    tokens: T,
    events: EventStream,
    waiters: HashMap<MutationSeq, oneshot::Sender<Result<Value, MutationError>>>,
    rejections: HashMap<MutationSeq, MutationError>,
    settled: Vec<SettledMutation>,
    refused: HashSet<QueryKey>,
}

impl<B, T> OptimistClient<B, T>
where
    B: Backend,
    T: TokenSource,
{
    /// Build a client around a backend, a token source and the stream the
    /// backend reports on.
    pub fn new(backend: B, tokens: T, events: EventStream) -> Self {
        Self {
            cache: QueryCache::new(),
            engine: PatchEngine::new(),
            reconciler: Reconciler::new(),
            backend,
            tokens,
            events,
            waiters: HashMap::new(),
            rejections: HashMap::new(),
            settled: Vec::new(),
            refused: HashSet::new(),
        }
    }

    /// Subscribe to `key`. The first subscriber opens the backend
    /// subscription; if the transport refuses, the entry becomes
    /// [`CacheEntry::Failed`].
    pub fn subscribe<F>(&mut self, key: QueryKey, listener: F) -> Subscription
    where
        F: FnMut(&QueryKey, &CacheEntry) + 'static,
    {
        let sub = self.cache.subscribe(key, listener);
        self.flush_lifecycle();
        sub
    }

    /// Detach a subscriber; the last one closes the backend subscription.
    /// In-flight mutations touching the key still reconcile.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let removed = self.cache.unsubscribe(subscription);
        self.flush_lifecycle();
        removed
    }

    fn flush_lifecycle(&mut self) {
        for change in self.cache.drain_lifecycle() {
            match change {
                Lifecycle::Opened(key) => {
                    self.open_backend(&key);
                }
                Lifecycle::Closed(key) if self.refused.remove(&key) => {
                    debug!(key = %key, "closing a subscription the backend never opened");
                }
                Lifecycle::Closed(key) => self.backend.unsubscribe_query(&key),
            }
        }
    }

    /// Ask the backend for `key`. A refusal marks the entry failed and
    /// remembers the key so closing it does not reach the backend.
    fn open_backend(&mut self, key: &QueryKey) -> bool {
        let token = self.tokens.access_token();
        match self.backend.subscribe_query(key, token.as_ref()) {
            Ok(()) => {
                self.refused.remove(key);
                true
            }
            Err(err) => {
                warn!(key = %key, error = %err, "backend subscription failed");
                self.refused.insert(key.clone());
                self.reconciler
                    .apply_push(&mut self.cache, key, CacheEntry::Failed(err.to_string()));
                false
            }
        }
    }

    /// Ask the backend again for a subscription it refused. On success the
    /// entry goes back to [`CacheEntry::Unknown`] until data arrives.
    ///
    /// Returns `false` if `key` has no refused subscription or the backend
    /// refused again.
    pub fn retry_subscription(&mut self, key: &QueryKey) -> bool {
        if !self.refused.contains(key) {
            return false;
        }
        if !self.open_backend(key) {
            return false;
        }
        self.reconciler.apply_push(&mut self.cache, key, CacheEntry::Unknown);
        true
    }

    /// Returns `true` if the backend refused the subscription for `key` and
    /// it has not been retried successfully since.
    pub fn is_refused(&self, key: &QueryKey) -> bool {
        self.refused.contains(key)
    }

    /// Current entry for `key`.
    pub fn get(&self, key: &QueryKey) -> &CacheEntry {
        self.cache.get(key)
    }

    /// Read-only access to the cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Invoke `mutation` with `args`, applying `patch` to the cache before
    /// the call is sent.
    ///
    /// Returns immediately with a ticket for the eventual outcome. A transport
    /// that refuses the call counts as a rejection: the patch is rolled back
    /// and the ticket resolves to a transport error.
    #[instrument(skip_all, fields(mutation = %mutation))]
    pub fn mutate<P>(
        &mut self,
        mutation: MutationRef,
        args: Args,
        patch: &P,
    ) -> Result<MutationTicket, ClientError>
    where
        P: OptimisticPatch + ?Sized,
    {
        let seq = self
            .engine
            .invoke(&mut self.cache, mutation.clone(), args.clone(), patch)?;
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(seq, tx);

        let token = self.tokens.access_token();
        let call = MutationCall {
            seq,
            mutation,
            args,
        };
        if let Err(err) = self.backend.call_mutation(call, token.as_ref()) {
            warn!(%seq, error = %err, "mutation not sent");
            self.resolve_mutation(seq, Err(MutationError::transport(err.0)));
        }
        Ok(MutationTicket::new(seq, rx))
    }

    /// Apply one backend event.
    pub fn handle_event(&mut self, event: BackendEvent) {
        debug!(event = event.label(), "backend event");
        match event {
            BackendEvent::QueryUpdated { key, value } => {
                self.reconciler.apply_push(&mut self.cache, &key, value);
            }
            BackendEvent::QueryFailed { key, message } => {
                warn!(key = %key, %message, "query failed on the server");
                self.reconciler
                    .apply_push(&mut self.cache, &key, CacheEntry::Failed(message));
            }
            BackendEvent::MutationResolved { seq, outcome } => self.resolve_mutation(seq, outcome),
        }
    }

    fn resolve_mutation(&mut self, seq: MutationSeq, outcome: Result<Value, MutationError>) {
        let Some(waiter) = self.waiters.remove(&seq) else {
            warn!(%seq, "outcome for unknown or already resolved mutation");
            return;
        };
        let resolution = match &outcome {
            Ok(_) => Resolution::Confirm,
            Err(err) => {
                self.rejections.insert(seq, err.clone());
                Resolution::Reject
            }
        };
        if waiter.send(outcome).is_err() {
            debug!(%seq, "mutation ticket dropped by caller");
        }
        for settled in self
            .reconciler
            .resolve(&mut self.cache, &mut self.engine, seq, resolution)
        {
            let error = self.rejections.remove(&settled.seq);
            self.settled.push(SettledMutation { settled, error });
        }
    }

    /// Apply every event that is already waiting. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.events.try_next() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for one event and apply it. `false` once the backend hung up.
    pub async fn next_event(&mut self) -> bool {
        match self.events.next().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Take mutations settled since the last call, in settlement order.
    pub fn drain_settled(&mut self) -> Vec<SettledMutation> {
        std::mem::take(&mut self.settled)
    }

    /// Number of mutations not yet settled.
    pub fn pending_count(&self) -> usize {
        self.engine.pending_count()
    }

    /// Returns `true` while `seq` is unsettled.
    pub fn is_pending(&self, seq: MutationSeq) -> bool {
        self.engine.is_pending(seq)
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
