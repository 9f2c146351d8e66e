// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client preferences persisted through the config service.

use crate::config::{ConfigError, ConfigService, ConfigStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Config key the client prefs are stored under.
pub const CLIENT_PREFS_KEY: &str = "optimist-client";

/// Tunables for an Optimist client. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientPrefs {
    /// Prefix for client-generated placeholder record ids.
    pub placeholder_prefix: String,
    /// How long failure toasts stay visible, in milliseconds.
    pub toast_ttl_ms: u64,
    /// Maximum number of queued toasts.
    pub max_toasts: usize,
    /// Surface rolled-back mutations as error toasts.
    pub report_rollbacks: bool,
}

impl Default for ClientPrefs {
    fn default() -> Self {
        Self {
            placeholder_prefix: "tmp-".to_owned(),
            toast_ttl_ms: 4000,
            max_toasts: 8,
            report_rollbacks: true,
        }
    }
}

impl ClientPrefs {
    /// Toast lifetime as a `Duration`.
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ttl_ms)
    }

    /// Reject prefs a client cannot run with. An empty placeholder prefix
    /// would make placeholder ids indistinguishable from server ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.placeholder_prefix.is_empty() {
            return Err(ConfigError::InvalidPrefs("empty placeholder_prefix".into()));
        }
        if self.max_toasts == 0 {
            return Err(ConfigError::InvalidPrefs("max_toasts must be at least 1".into()));
        }
        Ok(())
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Stored client prefs, or defaults when none are stored.
    pub fn load_prefs(&self) -> Result<ClientPrefs, ConfigError> {
        let prefs: ClientPrefs = self.load_or_default(CLIENT_PREFS_KEY)?;
        prefs.validate()?;
        Ok(prefs)
    }

    /// Validate and store client prefs.
    pub fn save_prefs(&self, prefs: &ClientPrefs) -> Result<(), ConfigError> {
        prefs.validate()?;
        self.save(CLIENT_PREFS_KEY, prefs)
    }
}
