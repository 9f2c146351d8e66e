// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! To-do list on top of the Optimist client.
//!
//! The backend exposes one query (`todos:listMine`) and four mutations. Each
//! mutation ships with an optimistic patch, so the list reacts on the same
//! frame the user acts; [`TodoApp`] turns rejected changes into toasts.
#![forbid(unsafe_code)]

pub mod api;
mod app;
mod model;
mod patches;

pub use app::TodoApp;
pub use model::{decode_list, validate_text, Todo, TodoId, MAX_TEXT_CHARS};
pub use patches::{AddTodo, RemoveTodo, RenameTodo, ToggleTodo};

use optimist_client::ClientError;
use thiserror::Error;

/// Errors raised before a to-do mutation is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    /// Text was empty after trimming.
    #[error("to-do text is empty")]
    EmptyText,
    /// Text exceeded the length limit.
    #[error("to-do text is {len} characters, limit is {max}")]
    TextTooLong {
        /// Trimmed length in characters.
        len: usize,
        /// Limit.
        max: usize,
    },
    /// The target only exists locally; wait for the server id.
    #[error("to-do {0} has not been saved yet")]
    PlaceholderId(String),
    /// A record did not have the expected fields.
    #[error("malformed to-do data: {0}")]
    Malformed(String),
    /// The client refused the mutation.
    #[error(transparent)]
    Client(#[from] ClientError),
}
