// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Events pushed by the reactive backend into the client.

use crate::{MutationSeq, QueryKey, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the backend rejected a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationErrorKind {
    /// Arguments failed server-side validation.
    Validation,
    /// The caller's token was missing or rejected.
    Unauthorized,
    /// The request never completed (connection dropped, timeout).
    Transport,
    /// The mutation function itself failed.
    Server,
}

impl std::fmt::Display for MutationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MutationErrorKind::Validation => "validation",
            MutationErrorKind::Unauthorized => "unauthorized",
            MutationErrorKind::Transport => "transport",
            MutationErrorKind::Server => "server",
        })
    }
}

/// Rejection delivered for a mutation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} error: {message}")]
pub struct MutationError {
    /// Failure category.
    pub kind: MutationErrorKind,
    /// Human readable message from the backend.
    pub message: String,
}

impl MutationError {
    /// Build an error of the given kind.
    pub fn new(kind: MutationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Server-side validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Validation, message)
    }

    /// Missing or rejected identity.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Unauthorized, message)
    }

    /// Transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Transport, message)
    }

    /// Mutation function failure.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Server, message)
    }
}

/// Event delivered by the backend over the subscription channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendEvent {
    /// Authoritative result for a subscribed query.
    QueryUpdated {
        /// Subscribed query.
        key: QueryKey,
        /// New server-side result.
        value: Value,
    },
    /// The query function failed on the server.
    QueryFailed {
        /// Subscribed query.
        key: QueryKey,
        /// Server error message.
        message: String,
    },
    /// Outcome of one mutation call.
    MutationResolved {
        /// Sequence number the call was sent with.
        seq: MutationSeq,
        /// Returned value or rejection.
        outcome: Result<Value, MutationError>,
    },
}

impl BackendEvent {
    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            BackendEvent::QueryUpdated { .. } => "query_updated",
            BackendEvent::QueryFailed { .. } => "query_failed",
            BackendEvent::MutationResolved { outcome: Ok(_), .. } => "mutation_ok",
            BackendEvent::MutationResolved { outcome: Err(_), .. } => "mutation_err",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_kind() {
        let err = MutationError::validation("text must not be empty");
        assert_eq!(err.to_string(), "validation error: text must not be empty");
    }

    #[test]
    fn labels_split_mutation_outcomes() {
        let ok = BackendEvent::MutationResolved {
            seq: MutationSeq(1),
            outcome: Ok(Value::Null),
        };
        let err = BackendEvent::MutationResolved {
            seq: MutationSeq(1),
            outcome: Err(MutationError::transport("reset")),
        };
        assert_eq!(ok.label(), "mutation_ok");
        assert_eq!(err.label(), "mutation_err");
    }
}
