// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canned query keys and server payloads.

use optimist_proto::{Args, QueryKey, QueryRef, Value};
use std::collections::BTreeMap;

/// `todos:listMine` with no arguments.
pub fn todo_list_key() -> QueryKey {
    QueryKey::bare(QueryRef::new("todos", "listMine"))
}

/// `counter:get` for the given counter name.
pub fn counter_key(name: &str) -> QueryKey {
    QueryKey::new(QueryRef::new("counter", "get"), Args::new().with("name", name))
}

/// One to-do record the way the server returns it.
pub fn todo_value(id: &str, text: &str, completed: bool) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), Value::from(id));
    fields.insert("text".to_string(), Value::from(text));
    fields.insert("completed".to_string(), Value::Bool(completed));
    Value::Object(fields)
}

/// A `todos:listMine` result from `(id, text, completed)` triples.
pub fn todo_list(rows: &[(&str, &str, bool)]) -> Value {
    Value::Array(
        rows.iter()
            .map(|(id, text, completed)| todo_value(id, text, *completed))
            .collect(),
    )
}
