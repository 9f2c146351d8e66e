// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Optimist clients (config, prefs, toasts).
//! Keeps UI adapters thin: they read prefs and render toasts, nothing more.

pub mod config;
pub mod prefs;
pub mod toast;
