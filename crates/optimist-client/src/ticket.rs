// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Caller-facing handle for one in-flight mutation.

use optimist_proto::{MutationError, MutationSeq, Value};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Outcome = Result<Value, MutationError>;

/// Resolves to the mutation's return value, or its rejection.
///
/// Dropping the ticket only discards the outcome; the client still rolls the
/// optimistic patch back if the backend rejects the call.
#[derive(Debug)]
pub struct MutationTicket {
    seq: MutationSeq,
    rx: Option<oneshot::Receiver<Outcome>>,
}

impl MutationTicket {
    pub(crate) fn new(seq: MutationSeq, rx: oneshot::Receiver<Outcome>) -> Self {
        Self { seq, rx: Some(rx) }
    }

    /// Sequence number of the mutation.
    pub fn seq(&self) -> MutationSeq {
        self.seq
    }

    /// Outcome if it has already arrived.
    ///
    /// The outcome is handed out once. Later calls, and awaiting the ticket
    /// afterwards, yield a transport error saying it was already taken.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        let Some(rx) = self.rx.as_mut() else {
            return Some(Err(already_taken()));
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(client_gone()),
        };
        self.rx = None;
        Some(outcome)
    }
}

fn client_gone() -> MutationError {
    MutationError::transport("client dropped before the mutation resolved")
}

fn already_taken() -> MutationError {
    MutationError::transport("mutation outcome was already taken")
}

impl Future for MutationTicket {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(Err(already_taken()));
        };
        let outcome = match Pin::new(rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(res) => res.unwrap_or_else(|_| Err(client_gone())),
        };
        self.rx = None;
        Poll::Ready(outcome)
    }
}
