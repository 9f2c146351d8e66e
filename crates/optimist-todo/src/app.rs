// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! UI-facing facade: one watched list, four mutations, failure toasts.

use crate::api;
use crate::model::{decode_list, validate_text, Todo, TodoId};
use crate::patches::{AddTodo, RemoveTodo, RenameTodo, ToggleTodo};
use crate::TodoError;
use optimist_app_core::config::{ConfigError, ConfigService, ConfigStore};
use optimist_app_core::prefs::ClientPrefs;
use optimist_app_core::toast::{ToastId, ToastKind, ToastOrigin, ToastRender, ToastService};
use optimist_client::{Backend, MutationTicket, OptimistClient, TokenSource};
use optimist_core::{CacheEntry, Subscription};
use optimist_proto::Args;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
use tracing::{info, warn};

/// To-do list application state.
pub struct TodoApp<B, T> {
    client: OptimistClient<B, T>,
    prefs: ClientPrefs,
    toasts: ToastService,
    list: Option<Subscription>,
    changed: Rc<Cell<bool>>,
    reported_failure: Option<String>,
    add: AddTodo,
}

impl<B, T> TodoApp<B, T>
where
    B: Backend,
    T: TokenSource,
{
    /// Start watching `todos:listMine` through `client`.
    pub fn new(mut client: OptimistClient<B, T>, prefs: ClientPrefs) -> Self {
        let changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&changed);
        let list = client.subscribe(api::list_mine(), move |_, _| flag.set(true));
        Self {
            client,
            toasts: ToastService::new(prefs.max_toasts),
            add: AddTodo {
                placeholder_prefix: prefs.placeholder_prefix.clone(),
            },
            prefs,
            list: Some(list),
            changed,
            reported_failure: None,
        }
    }

    /// Like [`new`](Self::new), reading prefs from `config` (defaults when
    /// nothing is stored). Stored prefs that fail [`ClientPrefs::validate`]
    /// are an error.
    pub fn with_config<S: ConfigStore>(
        client: OptimistClient<B, T>,
        config: &ConfigService<S>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(client, config.load_prefs()?))
    }

    /// Preferences in effect.
    pub fn prefs(&self) -> &ClientPrefs {
        &self.prefs
    }

    /// Underlying client.
    pub fn client(&self) -> &OptimistClient<B, T> {
        &self.client
    }

    /// Mutable access to the underlying client.
    pub fn client_mut(&mut self) -> &mut OptimistClient<B, T> {
        &mut self.client
    }

    /// Add a to-do. It shows up immediately under a placeholder id.
    pub fn add(&mut self, text: &str) -> Result<MutationTicket, TodoError> {
        let text = validate_text(text)?;
        let args = Args::new().with("text", text);
        Ok(self.client.mutate(api::add(), args, &self.add)?)
    }

    /// Flip a to-do's done flag.
    pub fn toggle(&mut self, id: &TodoId) -> Result<MutationTicket, TodoError> {
        let args = Args::new().with("id", id.server_id()?);
        Ok(self.client.mutate(api::toggle(), args, &ToggleTodo)?)
    }

    /// Delete a to-do.
    pub fn remove(&mut self, id: &TodoId) -> Result<MutationTicket, TodoError> {
        let args = Args::new().with("id", id.server_id()?);
        Ok(self.client.mutate(api::remove(), args, &RemoveTodo)?)
    }

    /// Change a to-do's text.
    pub fn rename(&mut self, id: &TodoId, text: &str) -> Result<MutationTicket, TodoError> {
        let text = validate_text(text)?;
        let args = Args::new().with("id", id.server_id()?).with("text", text);
        Ok(self.client.mutate(api::rename(), args, &RenameTodo)?)
    }

    /// Current list, optimistic changes included. `None` while loading or
    /// after the query failed.
    pub fn todos(&self) -> Option<Vec<Todo>> {
        let value = self.client.get(&api::list_mine()).value()?;
        match decode_list(value, &self.prefs.placeholder_prefix) {
            Ok(todos) => Some(todos),
            Err(err) => {
                warn!(error = %err, "undecodable to-do list");
                None
            }
        }
    }

    /// Server error for the list query, if it failed.
    pub fn load_error(&self) -> Option<&str> {
        match self.client.get(&api::list_mine()) {
            CacheEntry::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Returns `true` once after each change to the list.
    pub fn take_changed(&self) -> bool {
        self.changed.replace(false)
    }

    /// Apply pending backend events and turn rollbacks and query failures
    /// into toasts. Returns the number of events applied.
    pub fn sync(&mut self, now: Instant) -> usize {
        let applied = self.client.pump();
        for done in self.client.drain_settled() {
            let Some(error) = done.error else {
                continue;
            };
            info!(seq = %done.settled.seq, error = %error, "to-do change rolled back");
            if self.prefs.report_rollbacks {
                self.toasts.push(
                    ToastKind::Error,
                    ToastOrigin::Mutation(done.settled.seq),
                    format!("Couldn't {}", api::describe(&done.settled.mutation)),
                    Some(error.message),
                    self.prefs.toast_ttl(),
                    now,
                );
            }
        }
        let failure = self.load_error().map(str::to_owned);
        if failure.is_some() && failure != self.reported_failure {
            self.toasts.push(
                ToastKind::Warn,
                ToastOrigin::Query(api::list_mine()),
                "Couldn't load your to-dos",
                failure.clone(),
                self.prefs.toast_ttl(),
                now,
            );
        }
        self.reported_failure = failure;
        applied
    }

    /// Visible toasts, expiring old ones first.
    pub fn toasts(&mut self, now: Instant) -> Vec<ToastRender> {
        self.toasts.retain_visible(now);
        self.toasts.visible(now)
    }

    /// Dismiss a toast early.
    pub fn dismiss_toast(&mut self, id: ToastId) -> bool {
        self.toasts.dismiss(id)
    }

    /// Stop watching the list. Pending mutations still settle.
    pub fn close(&mut self) {
        if let Some(list) = self.list.take() {
            self.client.unsubscribe(list);
        }
    }
}
