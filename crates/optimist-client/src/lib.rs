// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optimistic client over a reactive backend port.
//!
//! [`OptimistClient`] glues `optimist-core` to two external collaborators:
//! a [`Backend`] (subscribe to queries, call mutations) and a [`TokenSource`]
//! (opaque bearer tokens). Backend results flow back as events on the channel
//! from [`event_channel`]; the owner applies them with
//! [`OptimistClient::pump`] or [`OptimistClient::next_event`].

mod client;
mod port;
mod ticket;

pub use client::{ClientError, OptimistClient, SettledMutation};
pub use port::{
    event_channel, Anonymous, Backend, EventSink, EventStream, MutationCall, TokenSource,
    TransportError,
};
pub use ticket::MutationTicket;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use optimist_core::{patch_fn, CacheEntry, NoPatch};
    use optimist_proto::{
        AccessToken, Args, BackendEvent, MutationError, MutationRef, QueryKey, QueryRef, Value,
    };

    #[derive(Default)]
    struct Recorder {
        opened: Vec<QueryKey>,
        closed: Vec<QueryKey>,
        calls: Vec<(MutationCall, Option<AccessToken>)>,
        refuse_calls: bool,
    }

    impl Backend for Recorder {
        fn subscribe_query(
            &mut self,
            key: &QueryKey,
            _token: Option<&AccessToken>,
        ) -> Result<(), TransportError> {
            self.opened.push(key.clone());
            Ok(())
        }

        fn unsubscribe_query(&mut self, key: &QueryKey) {
            self.closed.push(key.clone());
        }

        fn call_mutation(
            &mut self,
            call: MutationCall,
            token: Option<&AccessToken>,
        ) -> Result<(), TransportError> {
            if self.refuse_calls {
                return Err(TransportError("offline".into()));
            }
            self.calls.push((call, token.cloned()));
            Ok(())
        }
    }

    fn key() -> QueryKey {
        QueryKey::bare(QueryRef::new("counter", "get"))
    }

    #[test]
    fn first_and_last_subscriber_drive_backend_subscription() {
        let (_sink, stream) = event_channel();
        let mut client = OptimistClient::new(Recorder::default(), Anonymous, stream);
        let a = client.subscribe(key(), |_, _| {});
        let b = client.subscribe(key(), |_, _| {});
        assert_eq!(client.backend().opened, vec![key()]);
        assert!(client.unsubscribe(a));
        assert!(client.backend().closed.is_empty());
        assert!(client.unsubscribe(b));
        assert_eq!(client.backend().closed, vec![key()]);
    }

    #[test]
    fn mutation_carries_token_and_seq() {
        let (_sink, stream) = event_channel();
        let tokens = || Some(AccessToken::new("t0k"));
        let mut client = OptimistClient::new(Recorder::default(), tokens, stream);
        let ticket = client
            .mutate(
                MutationRef::new("counter", "bump"),
                Args::new().with("by", 2i64),
                &NoPatch,
            )
            .unwrap();
        let (call, token) = &client.backend().calls[0];
        assert_eq!(call.seq, ticket.seq());
        assert_eq!(call.args.get("by"), Some(&Value::Int(2)));
        assert_eq!(token.as_ref().map(AccessToken::secret), Some("t0k"));
    }

    #[test]
    fn refused_call_rolls_back_immediately() {
        let (_sink, stream) = event_channel();
        let backend = Recorder {
            refuse_calls: true,
            ..Recorder::default()
        };
        let mut client = OptimistClient::new(backend, Anonymous, stream);
        let _sub = client.subscribe(key(), |_, _| {});
        client.handle_event(BackendEvent::QueryUpdated {
            key: key(),
            value: Value::Int(1),
        });
        let mut ticket = client
            .mutate(
                MutationRef::new("counter", "bump"),
                Args::new(),
                &patch_fn(|_| Ok(vec![(key(), Value::Int(2))])),
            )
            .unwrap();
        assert_eq!(client.get(&key()), &CacheEntry::Ready(Value::Int(1)));
        assert_eq!(client.pending_count(), 0);
        let outcome = ticket.try_outcome().unwrap();
        assert_eq!(outcome, Err(MutationError::transport("offline")));
        let settled = client.drain_settled();
        assert!(settled[0].is_rolled_back());
        assert_eq!(settled[0].error, Some(MutationError::transport("offline")));
    }

    #[test]
    fn failed_query_push_marks_entry_failed() {
        let (sink, stream) = event_channel();
        let mut client = OptimistClient::new(Recorder::default(), Anonymous, stream);
        let _sub = client.subscribe(key(), |_, _| {});
        assert!(sink.send(BackendEvent::QueryFailed {
            key: key(),
            message: "boom".into(),
        }));
        assert_eq!(client.pump(), 1);
        assert_eq!(client.get(&key()), &CacheEntry::Failed("boom".into()));
    }
}
