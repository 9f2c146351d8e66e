// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! To-do app scenarios against the fake backend.
#![allow(clippy::unwrap_used)]

use optimist_app_core::config::{ConfigError, ConfigService};
use optimist_app_core::prefs::{ClientPrefs, CLIENT_PREFS_KEY};
use optimist_app_core::toast::{ToastKind, ToastOrigin};
use optimist_client::OptimistClient;
use optimist_dry_tests::{todo_list, todo_list_key, FakeBackend, InMemoryConfigStore, StaticToken};
use optimist_proto::{MutationError, MutationSeq, Value};
use optimist_todo::{api, Todo, TodoApp, TodoError, TodoId};
use proptest::prelude::*;
use std::time::{Duration, Instant};

type App = TodoApp<FakeBackend, StaticToken>;

fn app_with(prefs: ClientPrefs) -> (App, FakeBackend) {
    let (backend, events) = FakeBackend::connect();
    let client = OptimistClient::new(backend.clone(), StaticToken::signed_in("me"), events);
    (TodoApp::new(client, prefs), backend)
}

fn loaded(rows: &[(&str, &str, bool)]) -> (App, FakeBackend) {
    let (mut app, backend) = app_with(ClientPrefs::default());
    backend.push(&todo_list_key(), todo_list(rows));
    app.sync(Instant::now());
    (app, backend)
}

fn server(id: &str) -> TodoId {
    TodoId::Server(id.into())
}

fn texts(app: &App) -> Vec<(String, bool)> {
    app.todos()
        .unwrap()
        .into_iter()
        .map(|t| (t.text, t.completed))
        .collect()
}

#[test]
fn list_is_loading_until_the_first_push() {
    let (mut app, backend) = app_with(ClientPrefs::default());
    assert_eq!(backend.active_subscriptions(), vec![api::list_mine()]);
    assert!(app.todos().is_none());
    backend.push(&todo_list_key(), todo_list(&[("a1", "milk", false)]));
    assert_eq!(app.sync(Instant::now()), 1);
    assert!(app.take_changed());
    assert!(!app.take_changed());
    assert_eq!(
        app.todos().unwrap(),
        vec![Todo {
            id: server("a1"),
            text: "milk".into(),
            completed: false,
        }]
    );
}

#[test]
fn rejected_add_disappears_and_raises_a_toast() {
    let (mut app, backend) = loaded(&[("a1", "milk", false)]);
    let ticket = app.add("  bread ").unwrap();
    assert_eq!(ticket.seq(), MutationSeq(1));
    assert_eq!(backend.last_call().unwrap().args.get_str("text"), Some("bread"));

    let todos = app.todos().unwrap();
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[1].id, TodoId::Placeholder("tmp-1".into()));
    assert!(todos[1].id.is_placeholder());

    backend.reject(ticket.seq(), MutationError::validation("text is banned"));
    let now = Instant::now();
    app.sync(now);
    assert_eq!(texts(&app), vec![("milk".to_string(), false)]);

    let toasts = app.toasts(now);
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert_eq!(toasts[0].origin, ToastOrigin::Mutation(MutationSeq(1)));
    assert_eq!(toasts[0].title, "Couldn't add the to-do");
    assert_eq!(toasts[0].body.as_deref(), Some("text is banned"));
    assert!(app.toasts(now + Duration::from_secs(5)).is_empty());
}

#[test]
fn add_then_fail_on_an_empty_list() {
    let (mut app, backend) = loaded(&[]);
    let ticket = app.add("Buy milk").unwrap();
    assert_eq!(
        app.todos().unwrap(),
        vec![Todo {
            id: TodoId::Placeholder("tmp-1".into()),
            text: "Buy milk".into(),
            completed: false,
        }]
    );
    backend.reject(ticket.seq(), MutationError::transport("connection reset"));
    app.sync(Instant::now());
    assert_eq!(app.todos().unwrap(), Vec::<Todo>::new());
}

#[test]
fn unrelated_push_overrides_a_pending_toggle() {
    let (mut app, backend) = loaded(&[("a", "milk", false)]);
    app.toggle(&server("a")).unwrap();
    assert_eq!(texts(&app), vec![("milk".to_string(), true)]);

    let pushed = todo_list(&[("a", "milk", false), ("b", "eggs", false)]);
    backend.push(&todo_list_key(), pushed.clone());
    app.sync(Instant::now());
    assert_eq!(app.client().get(&todo_list_key()).value(), Some(&pushed));
    assert_eq!(app.client().pending_count(), 1);
}

#[test]
fn confirmed_add_is_replaced_by_the_server_record() {
    let (mut app, backend) = loaded(&[("a1", "milk", false)]);
    let ticket = app.add("bread").unwrap();
    backend.push(
        &todo_list_key(),
        todo_list(&[("a1", "milk", false), ("b7", "bread", false)]),
    );
    backend.confirm(ticket.seq(), "b7");
    app.sync(Instant::now());
    let ids: Vec<TodoId> = app.todos().unwrap().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![server("a1"), server("b7")]);
    assert_eq!(app.client().pending_count(), 0);
    assert!(app.toasts(Instant::now()).is_empty());
}

#[test]
fn server_push_wins_a_toggle_race() {
    let (mut app, backend) = loaded(&[("a1", "milk", false)]);
    let first = app.toggle(&server("a1")).unwrap();
    let second = app.toggle(&server("a1")).unwrap();
    assert_eq!(texts(&app), vec![("milk".to_string(), false)]);

    // Server applied the first toggle and says so before rejecting the second.
    backend.push(&todo_list_key(), todo_list(&[("a1", "milk", true)]));
    backend.confirm(first.seq(), Value::Null);
    backend.reject(second.seq(), MutationError::server("conflict"));
    app.sync(Instant::now());

    assert_eq!(texts(&app), vec![("milk".to_string(), true)]);
    assert_eq!(app.toasts(Instant::now()).len(), 1);
}

#[test]
fn rename_and_remove_predict_immediately() {
    let (mut app, backend) = loaded(&[("a1", "milk", false), ("a2", "eggs", false)]);
    app.rename(&server("a2"), "free-range eggs").unwrap();
    app.remove(&server("a1")).unwrap();
    assert_eq!(texts(&app), vec![("free-range eggs".to_string(), false)]);
    let sent: Vec<_> = backend
        .calls()
        .into_iter()
        .map(|c| c.mutation.to_string())
        .collect();
    assert_eq!(sent, vec!["todos:rename", "todos:remove"]);
}

#[test]
fn invalid_input_is_refused_before_sending() {
    let (mut app, backend) = loaded(&[("a1", "milk", false)]);
    assert_eq!(app.add("   ").unwrap_err(), TodoError::EmptyText);
    assert!(matches!(
        app.rename(&server("a1"), &"x".repeat(501)),
        Err(TodoError::TextTooLong { len: 501, max: 500 })
    ));
    let placeholder = TodoId::Placeholder("tmp-9".into());
    assert_eq!(
        app.toggle(&placeholder).unwrap_err(),
        TodoError::PlaceholderId("tmp-9".into())
    );
    assert!(backend.calls().is_empty());
    assert_eq!(app.client().pending_count(), 0);
}

#[test]
fn offline_add_rolls_back_on_the_next_sync() {
    let (mut app, backend) = loaded(&[("a1", "milk", false)]);
    backend.set_offline(true);
    app.add("bread").unwrap();
    assert_eq!(app.todos().unwrap().len(), 1);
    app.sync(Instant::now());
    let toasts = app.toasts(Instant::now());
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].body.as_deref().unwrap().contains("offline"));
}

#[test]
fn list_failure_is_reported_once() {
    let (mut app, backend) = app_with(ClientPrefs::default());
    backend.fail_query(&todo_list_key(), "permission denied");
    app.sync(Instant::now());
    app.sync(Instant::now() + Duration::from_secs(1));
    assert_eq!(app.load_error(), Some("permission denied"));
    assert!(app.todos().is_none());
    let toasts = app.toasts(Instant::now());
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].origin, ToastOrigin::Query(api::list_mine()));
}

#[test]
fn prefs_come_from_the_config_store() {
    let store = InMemoryConfigStore::with_raw(
        CLIENT_PREFS_KEY,
        r#"{"placeholder_prefix":"local-","report_rollbacks":false}"#,
    );
    let config = ConfigService::new(store.clone());
    let (backend, events) = FakeBackend::connect();
    let client = OptimistClient::new(backend.clone(), StaticToken::signed_out(), events);
    let mut app = TodoApp::with_config(client, &config).unwrap();
    assert_eq!(store.load_count(), 1);
    assert_eq!(app.prefs().toast_ttl_ms, 4000);

    backend.push(&todo_list_key(), todo_list(&[]));
    app.sync(Instant::now());
    let ticket = app.add("bread").unwrap();
    assert_eq!(
        app.todos().unwrap()[0].id,
        TodoId::Placeholder(format!("local-{}", ticket.seq().get()))
    );
    backend.reject(ticket.seq(), MutationError::server("nope"));
    app.sync(Instant::now());
    assert!(app.toasts(Instant::now()).is_empty());
}

#[test]
fn blank_placeholder_prefix_in_config_is_refused() {
    let store = InMemoryConfigStore::with_raw(CLIENT_PREFS_KEY, r#"{"placeholder_prefix":""}"#);
    let (backend, events) = FakeBackend::connect();
    let client = OptimistClient::new(backend, StaticToken::signed_out(), events);
    let err = TodoApp::with_config(client, &ConfigService::new(store)).err();
    assert!(matches!(err, Some(ConfigError::InvalidPrefs(_))));
}

#[test]
fn closing_the_app_releases_the_subscription() {
    let (mut app, backend) = loaded(&[]);
    app.close();
    assert!(backend.active_subscriptions().is_empty());
    assert!(app.todos().is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn add_ticket_yields_the_new_id() {
    let (mut app, backend) = loaded(&[]);
    let ticket = app.add("bread").unwrap();
    backend.confirm(ticket.seq(), "b7");
    app.sync(Instant::now());
    assert_eq!(ticket.await, Ok(Value::from("b7")));
}

fn toggles_and_rejection_order() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    prop::collection::vec(0usize..3, 1..8).prop_flat_map(|targets| {
        let order: Vec<usize> = (0..targets.len()).collect();
        (Just(targets), Just(order).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn rejecting_every_toggle_restores_the_list((targets, order) in toggles_and_rejection_order()) {
        let rows = [("a0", "milk", false), ("a1", "eggs", true), ("a2", "bread", false)];
        let (mut app, backend) = loaded(&rows);
        let before = app.todos().unwrap();

        let tickets: Vec<_> = targets
            .iter()
            .map(|i| app.toggle(&server(&format!("a{i}"))).unwrap())
            .collect();
        for i in order {
            backend.reject(tickets[i].seq(), MutationError::server("no"));
        }
        app.sync(Instant::now());

        prop_assert_eq!(app.todos().unwrap(), before);
        prop_assert_eq!(app.client().pending_count(), 0);
    }
}
