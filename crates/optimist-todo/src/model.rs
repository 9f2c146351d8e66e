// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! To-do records and their `Value` encoding.

use crate::TodoError;
use optimist_proto::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Longest accepted to-do text, in characters, after trimming.
pub const MAX_TEXT_CHARS: usize = 500;

/// Record id field.
pub(crate) const ID_FIELD: &str = "id";
pub(crate) const TEXT_FIELD: &str = "text";
pub(crate) const COMPLETED_FIELD: &str = "completed";

/// Identity of a to-do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TodoId {
    /// Assigned by the server.
    Server(String),
    /// Client-generated stand-in for a record the server has not created yet.
    Placeholder(String),
}

impl TodoId {
    /// Classify a raw id: anything carrying `placeholder_prefix` is ours.
    pub fn classify(raw: &str, placeholder_prefix: &str) -> Self {
        if !placeholder_prefix.is_empty() && raw.starts_with(placeholder_prefix) {
            TodoId::Placeholder(raw.to_owned())
        } else {
            TodoId::Server(raw.to_owned())
        }
    }

    /// Raw id string.
    pub fn as_str(&self) -> &str {
        match self {
            TodoId::Server(id) | TodoId::Placeholder(id) => id,
        }
    }

    /// Returns `true` for client-generated ids.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TodoId::Placeholder(_))
    }

    /// The id to send to the backend. Placeholders have none yet.
    pub fn server_id(&self) -> Result<&str, TodoError> {
        match self {
            TodoId::Server(id) => Ok(id),
            TodoId::Placeholder(id) => Err(TodoError::PlaceholderId(id.clone())),
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One to-do item as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    /// Identity.
    pub id: TodoId,
    /// Item text.
    pub text: String,
    /// Done flag.
    pub completed: bool,
}

impl Todo {
    /// Decode a record; ids with `placeholder_prefix` become placeholders.
    pub fn from_value(value: &Value, placeholder_prefix: &str) -> Result<Self, TodoError> {
        let id = value
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| TodoError::Malformed(format!("record without {ID_FIELD}")))?;
        let text = value
            .get(TEXT_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| TodoError::Malformed(format!("record {id} without {TEXT_FIELD}")))?;
        let completed = value
            .get(COMPLETED_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Self {
            id: TodoId::classify(id, placeholder_prefix),
            text: text.to_owned(),
            completed,
        })
    }

    /// Encode as a record.
    pub fn to_value(&self) -> Value {
        record(self.id.as_str(), &self.text, self.completed)
    }
}

pub(crate) fn record(id: &str, text: &str, completed: bool) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert(ID_FIELD.to_owned(), Value::from(id));
    fields.insert(TEXT_FIELD.to_owned(), Value::from(text));
    fields.insert(COMPLETED_FIELD.to_owned(), Value::Bool(completed));
    Value::Object(fields)
}

/// Decode a `todos:listMine` result.
pub fn decode_list(value: &Value, placeholder_prefix: &str) -> Result<Vec<Todo>, TodoError> {
    let items = value
        .as_array()
        .ok_or_else(|| TodoError::Malformed(format!("expected array, found {}", value.kind())))?;
    items
        .iter()
        .map(|item| Todo::from_value(item, placeholder_prefix))
        .collect()
}

/// Trim `text` and check it is acceptable as to-do text.
pub fn validate_text(text: &str) -> Result<String, TodoError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TodoError::EmptyText);
    }
    let len = trimmed.chars().count();
    if len > MAX_TEXT_CHARS {
        return Err(TodoError::TextTooLong {
            len,
            max: MAX_TEXT_CHARS,
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prefix_decides_placeholder() {
        assert_eq!(
            TodoId::classify("tmp-3", "tmp-"),
            TodoId::Placeholder("tmp-3".into())
        );
        assert_eq!(TodoId::classify("k57abc", "tmp-"), TodoId::Server("k57abc".into()));
        assert!(TodoId::classify("tmp-3", "").server_id().is_ok());
    }

    #[test]
    fn record_round_trips() {
        let todo = Todo {
            id: TodoId::Server("a1".into()),
            text: "milk".into(),
            completed: true,
        };
        assert_eq!(Todo::from_value(&todo.to_value(), "tmp-").unwrap(), todo);
    }

    #[test]
    fn missing_completed_defaults_to_open() {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), Value::from("a1"));
        fields.insert("text".to_string(), Value::from("milk"));
        let todo = Todo::from_value(&Value::Object(fields), "tmp-").unwrap();
        assert!(!todo.completed);
    }

    #[test]
    fn non_array_list_is_malformed() {
        assert!(matches!(
            decode_list(&Value::Int(3), "tmp-"),
            Err(TodoError::Malformed(_))
        ));
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(validate_text("  milk \n").unwrap(), "milk");
        assert_eq!(validate_text(" \t "), Err(TodoError::EmptyText));
        let long = "é".repeat(MAX_TEXT_CHARS + 1);
        assert_eq!(
            validate_text(&long),
            Err(TodoError::TextTooLong {
                len: MAX_TEXT_CHARS + 1,
                max: MAX_TEXT_CHARS
            })
        );
        assert!(validate_text(&"é".repeat(MAX_TEXT_CHARS)).is_ok());
    }
}
