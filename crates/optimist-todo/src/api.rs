// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Backend functions of the to-do module.

use optimist_proto::{MutationRef, QueryKey, QueryRef};

const MODULE: &str = "todos";

/// `todos:listMine`: the signed-in user's to-dos, oldest first.
pub fn list_mine() -> QueryKey {
    QueryKey::bare(QueryRef::new(MODULE, "listMine"))
}

/// `todos:add { text }`: returns the new record id.
pub fn add() -> MutationRef {
    MutationRef::new(MODULE, "add")
}

/// `todos:toggle { id }`.
pub fn toggle() -> MutationRef {
    MutationRef::new(MODULE, "toggle")
}

/// `todos:remove { id }`.
pub fn remove() -> MutationRef {
    MutationRef::new(MODULE, "remove")
}

/// `todos:rename { id, text }`.
pub fn rename() -> MutationRef {
    MutationRef::new(MODULE, "rename")
}

/// Short description of a to-do mutation for user-facing messages.
pub fn describe(mutation: &MutationRef) -> &'static str {
    match mutation.0.function() {
        "add" => "add the to-do",
        "toggle" => "update the to-do",
        "remove" => "delete the to-do",
        "rename" => "rename the to-do",
        _ => "save your change",
    }
}
