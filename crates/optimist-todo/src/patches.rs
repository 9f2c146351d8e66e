// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optimistic predictions for the to-do mutations.
//!
//! Every patch rewrites only `todos:listMine` and leaves it alone while the
//! list is still loading. Records are located by their raw `id`.

use crate::api;
use crate::model::{record, COMPLETED_FIELD, ID_FIELD, TEXT_FIELD};
use optimist_core::{OptimisticPatch, PatchContext, PatchError, PatchWrites};
use optimist_proto::Value;

fn arg<'a>(ctx: &PatchContext<'a>, name: &str) -> Result<&'a str, PatchError> {
    ctx.args
        .get_str(name)
        .ok_or_else(|| PatchError::Rejected(format!("missing string argument {name:?}")))
}

fn has_id(item: &Value, id: &str) -> bool {
    item.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

/// Rewrite the record with `id` in the cached list. No writes when the list
/// is unknown or the record is not in it.
fn edit_record<F>(ctx: &PatchContext<'_>, id: &str, edit: F) -> Result<PatchWrites, PatchError>
where
    F: Fn(&mut std::collections::BTreeMap<String, Value>),
{
    let key = api::list_mine();
    let Some(items) = ctx.current_list(&key)? else {
        return Ok(Vec::new());
    };
    if !items.iter().any(|item| has_id(item, id)) {
        return Ok(Vec::new());
    }
    let next = items
        .iter()
        .map(|item| match item {
            Value::Object(fields) if has_id(item, id) => {
                let mut fields = fields.clone();
                edit(&mut fields);
                Value::Object(fields)
            }
            other => other.clone(),
        })
        .collect();
    Ok(vec![(key, Value::Array(next))])
}

/// Appends a placeholder record `"{prefix}{seq}"`.
#[derive(Debug, Clone)]
pub struct AddTodo {
    /// Placeholder id prefix.
    pub placeholder_prefix: String,
}

impl AddTodo {
    /// Placeholder id for the mutation with sequence number `seq`.
    pub fn placeholder_id(&self, seq: u64) -> String {
        format!("{}{seq}", self.placeholder_prefix)
    }
}

impl OptimisticPatch for AddTodo {
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        let text = arg(ctx, "text")?;
        let key = api::list_mine();
        let Some(items) = ctx.current_list(&key)? else {
            return Ok(Vec::new());
        };
        let mut next = items.to_vec();
        next.push(record(&self.placeholder_id(ctx.seq.get()), text, false));
        Ok(vec![(key, Value::Array(next))])
    }
}

/// Flips `completed` on the target record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleTodo;

impl OptimisticPatch for ToggleTodo {
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        let id = arg(ctx, "id")?;
        edit_record(ctx, id, |fields| {
            let done = fields
                .get(COMPLETED_FIELD)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            fields.insert(COMPLETED_FIELD.to_owned(), Value::Bool(!done));
        })
    }
}

/// Drops the target record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveTodo;

impl OptimisticPatch for RemoveTodo {
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        let id = arg(ctx, "id")?;
        let key = api::list_mine();
        let Some(items) = ctx.current_list(&key)? else {
            return Ok(Vec::new());
        };
        let next: Vec<Value> = items
            .iter()
            .filter(|item| !has_id(item, id))
            .cloned()
            .collect();
        if next.len() == items.len() {
            return Ok(Vec::new());
        }
        Ok(vec![(key, Value::Array(next))])
    }
}

/// Replaces the target record's text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameTodo;

impl OptimisticPatch for RenameTodo {
    fn predict(&self, ctx: &PatchContext<'_>) -> Result<PatchWrites, PatchError> {
        let id = arg(ctx, "id")?;
        let text = arg(ctx, "text")?;
        edit_record(ctx, id, |fields| {
            fields.insert(TEXT_FIELD.to_owned(), Value::from(text));
        })
    }
}
