// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scriptable in-process backend.
//!
//! [`FakeBackend`] records what the client asks for and lets the test decide
//! when and how the "server" answers. Clones share state, so keep one handle
//! in the test after moving the other into the client.

use optimist_client::{event_channel, Backend, EventSink, EventStream, MutationCall, TransportError};
use optimist_proto::{AccessToken, BackendEvent, MutationError, MutationSeq, QueryKey, Value};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process [`Backend`] driven by the test.
#[derive(Clone)]
pub struct FakeBackend {
    sink: EventSink,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    active: Vec<QueryKey>,
    subscribe_count: usize,
    unsubscribe_count: usize,
    calls: Vec<MutationCall>,
    tokens: Vec<Option<String>>,
    offline: bool,
}

impl FakeBackend {
    /// Backend plus the event stream to hand to the client.
    pub fn connect() -> (Self, EventStream) {
        let (sink, stream) = event_channel();
        let backend = Self {
            sink,
            inner: Arc::default(),
        };
        (backend, stream)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// While offline, every subscribe and mutation call is refused.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Keys with an open backend subscription, in opening order.
    pub fn active_subscriptions(&self) -> Vec<QueryKey> {
        self.lock().active.clone()
    }

    /// Whether `key` currently has an open backend subscription.
    pub fn is_subscribed(&self, key: &QueryKey) -> bool {
        self.lock().active.contains(key)
    }

    /// Accepted `subscribe_query` calls.
    pub fn subscribe_count(&self) -> usize {
        self.lock().subscribe_count
    }

    /// `unsubscribe_query` calls.
    pub fn unsubscribe_count(&self) -> usize {
        self.lock().unsubscribe_count
    }

    /// Mutation calls accepted so far, in send order.
    pub fn calls(&self) -> Vec<MutationCall> {
        self.lock().calls.clone()
    }

    /// The most recent accepted mutation call.
    pub fn last_call(&self) -> Option<MutationCall> {
        self.lock().calls.last().cloned()
    }

    /// Token secret presented with each accepted call, subscriptions included.
    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.lock().tokens.clone()
    }

    /// Push an authoritative query result.
    pub fn push(&self, key: &QueryKey, value: impl Into<Value>) -> bool {
        self.sink.send(BackendEvent::QueryUpdated {
            key: key.clone(),
            value: value.into(),
        })
    }

    /// Report a server-side query failure.
    pub fn fail_query(&self, key: &QueryKey, message: &str) -> bool {
        self.sink.send(BackendEvent::QueryFailed {
            key: key.clone(),
            message: message.to_string(),
        })
    }

    /// Resolve `seq` successfully.
    pub fn confirm(&self, seq: MutationSeq, value: impl Into<Value>) -> bool {
        self.sink.send(BackendEvent::MutationResolved {
            seq,
            outcome: Ok(value.into()),
        })
    }

    /// Reject `seq`.
    pub fn reject(&self, seq: MutationSeq, error: MutationError) -> bool {
        self.sink.send(BackendEvent::MutationResolved {
            seq,
            outcome: Err(error),
        })
    }

    /// Raw sink, for events the helpers don't cover.
    pub fn sink(&self) -> &EventSink {
        &self.sink
    }
}

impl Backend for FakeBackend {
    fn subscribe_query(
        &mut self,
        key: &QueryKey,
        token: Option<&AccessToken>,
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(TransportError("fake backend offline".into()));
        }
        inner.subscribe_count += 1;
        inner.tokens.push(token.map(|t| t.secret().to_string()));
        inner.active.push(key.clone());
        Ok(())
    }

    fn unsubscribe_query(&mut self, key: &QueryKey) {
        let mut inner = self.lock();
        inner.unsubscribe_count += 1;
        inner.active.retain(|k| k != key);
    }

    fn call_mutation(
        &mut self,
        call: MutationCall,
        token: Option<&AccessToken>,
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(TransportError("fake backend offline".into()));
        }
        inner.tokens.push(token.map(|t| t.secret().to_string()));
        inner.calls.push(call);
        Ok(())
    }
}
