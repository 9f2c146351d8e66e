// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Optimist crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`backend`] - Scriptable in-process backend
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`fixtures`] - Canned query keys and server payloads
//! - [`identity`] - Fixed token source

pub mod backend;
pub mod config;
pub mod fixtures;
pub mod identity;

pub use backend::FakeBackend;
pub use config::InMemoryConfigStore;
pub use fixtures::{counter_key, todo_list, todo_list_key, todo_value};
pub use identity::StaticToken;
