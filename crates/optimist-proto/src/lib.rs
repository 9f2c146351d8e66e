// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema shared by the Optimist client layers: the JSON-shaped [`Value`]
//! model, query identity ([`QueryKey`]), function references, and the events
//! a reactive backend delivers back to the client.

mod event;
mod key;
mod value;

pub use event::{BackendEvent, MutationError, MutationErrorKind};
pub use key::{Args, FunctionPath, KeyDigest, MutationRef, QueryKey, QueryRef};
pub use value::Value;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-session sequence number assigned to every mutation invocation.
///
/// Strictly increasing for the lifetime of one client; the reconciler relies on
/// this ordering when applying confirmations and rollbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MutationSeq(pub u64);

impl MutationSeq {
    /// Raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MutationSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque bearer token issued by the identity provider.
///
/// The client never interprets it; it is forwarded verbatim to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for the transport's authorization header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Errors raised while building schema values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Function paths are written `module:function`.
    #[error("invalid function path {0:?}: expected `module:function`")]
    InvalidFunctionPath(String),
    /// Arguments must be a JSON object.
    #[error("arguments must be an object, got {0}")]
    ArgsNotObject(&'static str),
}
