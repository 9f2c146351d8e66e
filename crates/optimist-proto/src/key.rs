// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query identity: function references, arguments and [`QueryKey`].

use crate::value::{feed_str, Value};
use crate::ProtoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A backend function address written `module:function`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionPath {
    module: String,
    function: String,
}

impl FunctionPath {
    /// Build a path from its two halves.
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
        }
    }

    /// Module half (e.g. `todos`).
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Function half (e.g. `listMine`).
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for FunctionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.function)
    }
}

impl FromStr for FunctionPath {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((module, function))
                if !module.is_empty() && !function.is_empty() && !function.contains(':') =>
            {
                Ok(Self::new(module, function))
            }
            _ => Err(ProtoError::InvalidFunctionPath(s.to_owned())),
        }
    }
}

/// Reference to a backend query function.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryRef(pub FunctionPath);

/// Reference to a backend mutation function.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationRef(pub FunctionPath);

impl QueryRef {
    /// Build from `module` and `function` halves.
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self(FunctionPath::new(module, function))
    }
}

impl MutationRef {
    /// Build from `module` and `function` halves.
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self(FunctionPath::new(module, function))
    }
}

impl fmt::Display for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for MutationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QueryRef {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl FromStr for MutationRef {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Named arguments passed to a query or mutation.
///
/// Backed by a `BTreeMap`, so equality is deep and insertion order is
/// irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(BTreeMap<String, Value>);

impl Args {
    /// Empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Convenience: string argument by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no arguments are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate arguments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Build from a JSON object; anything else is rejected.
    pub fn from_json(json: serde_json::Value) -> Result<Self, ProtoError> {
        match Value::from(json) {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ProtoError::ArgsNotObject(other.kind())),
        }
    }
}

impl From<BTreeMap<String, Value>> for Args {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self(fields)
    }
}

/// BLAKE3 digest of a [`QueryKey`]; `Display` renders the first 8 bytes as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct KeyDigest(pub [u8; 32]);

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Identity of a subscribed query: function reference plus arguments.
///
/// Two keys are equal iff the query references match and the arguments are
/// deep-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    /// Query function.
    pub query: QueryRef,
    /// Arguments the query was subscribed with.
    pub args: Args,
}

impl QueryKey {
    /// Key for `query` called with `args`.
    pub fn new(query: QueryRef, args: Args) -> Self {
        Self { query, args }
    }

    /// Key for an argument-less query.
    pub fn bare(query: QueryRef) -> Self {
        Self::new(query, Args::new())
    }

    /// Stable content digest, suitable for log fields and cross-process ids.
    pub fn digest(&self) -> KeyDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"optimist:query-key:v1");
        feed_str(self.query.0.module(), &mut hasher);
        feed_str(self.query.0.function(), &mut hasher);
        Value::Object(self.args.0.clone()).feed_digest(&mut hasher);
        KeyDigest(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}()", self.query)
        } else {
            write!(f, "{}({})", self.query, self.digest())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_paths_parse_strictly() {
        let q: QueryRef = "todos:listMine".parse().unwrap();
        assert_eq!(q, QueryRef::new("todos", "listMine"));
        assert_eq!(q.to_string(), "todos:listMine");
        for bad in ["todos", ":listMine", "todos:", "a:b:c", ""] {
            assert!(bad.parse::<QueryRef>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn keys_compare_args_deeply() {
        let q = QueryRef::new("todos", "byList");
        let a = QueryKey::new(
            q.clone(),
            Args::from_json(json!({"list": "home", "filter": {"done": false}})).unwrap(),
        );
        let b = QueryKey::new(
            q.clone(),
            Args::new()
                .with("filter", Value::from(json!({"done": false})))
                .with("list", "home"),
        );
        let c = QueryKey::new(q, Args::new().with("list", "work"));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a, c);
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn digest_separates_query_names() {
        let a = QueryKey::bare(QueryRef::new("todos", "listMine"));
        let b = QueryKey::bare(QueryRef::new("todos", "listAll"));
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.to_string(), "todos:listMine()");
    }

    #[test]
    fn args_must_be_an_object() {
        assert_eq!(
            Args::from_json(json!([1, 2])),
            Err(ProtoError::ArgsNotObject("array"))
        );
    }
}
