// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the external collaborators: the reactive backend and the identity
//! provider, plus the channel the backend reports back on.
//!
//! The client never blocks on the backend. Calls are fire-and-forget; results
//! come back as [`BackendEvent`]s through an [`EventSink`].

use optimist_proto::{AccessToken, Args, BackendEvent, MutationRef, MutationSeq, QueryKey};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// A call could not even be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport unavailable: {0}")]
pub struct TransportError(pub String);

/// One mutation request, tagged with the sequence number its result must
/// echo back in [`BackendEvent::MutationResolved`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationCall {
    /// Client sequence number.
    pub seq: MutationSeq,
    /// Mutation function.
    pub mutation: MutationRef,
    /// Arguments.
    pub args: Args,
}

/// The hosted reactive query/mutation platform.
pub trait Backend {
    /// Start pushing results for `key` (as [`BackendEvent::QueryUpdated`]).
    fn subscribe_query(
        &mut self,
        key: &QueryKey,
        token: Option<&AccessToken>,
    ) -> Result<(), TransportError>;

    /// Stop pushing results for `key`.
    fn unsubscribe_query(&mut self, key: &QueryKey);

    /// Send a mutation; its outcome arrives later as
    /// [`BackendEvent::MutationResolved`].
    fn call_mutation(
        &mut self,
        call: MutationCall,
        token: Option<&AccessToken>,
    ) -> Result<(), TransportError>;
}

/// Identity provider: hands out bearer tokens, or `None` when signed out.
pub trait TokenSource {
    /// Current access token. Called once per backend call.
    fn access_token(&mut self) -> Option<AccessToken>;
}

/// Token source for signed-out sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenSource for Anonymous {
    fn access_token(&mut self) -> Option<AccessToken> {
        None
    }
}

impl<F> TokenSource for F
where
    F: FnMut() -> Option<AccessToken>,
{
    fn access_token(&mut self) -> Option<AccessToken> {
        self()
    }
}

/// Sending half of the backend event channel; owned by the transport.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<BackendEvent>,
}

impl EventSink {
    /// Deliver an event. Returns `false` once the client is gone.
    pub fn send(&self, event: BackendEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half of the backend event channel; owned by the client.
#[derive(Debug)]
pub struct EventStream {
    rx: UnboundedReceiver<BackendEvent>,
}

impl EventStream {
    /// Next event if one is ready.
    pub(crate) fn try_next(&mut self) -> Option<BackendEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event; `None` once every sink is dropped.
    pub(crate) async fn next(&mut self) -> Option<BackendEvent> {
        self.rx.recv().await
    }
}

/// Create a connected sink/stream pair.
pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventStream { rx })
}
