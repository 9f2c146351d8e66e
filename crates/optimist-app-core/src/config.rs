// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON documents under short logical keys, behind a storage port.
//!
//! [`ConfigService`] owns the encoding. Stores only move bytes. Client
//! preferences have typed accessors in [`crate::prefs`].

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Byte storage for config documents.
pub trait ConfigStore {
    /// Bytes stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace whatever is stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure reading or writing a config document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("not found")]
    NotFound,
    /// The store cannot hold a document under this key.
    #[error("invalid config key {0:?}")]
    InvalidKey(String),
    /// Stored or supplied client prefs are unusable.
    #[error("invalid client prefs: {0}")]
    InvalidPrefs(String),
    /// Storage I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Document is not valid JSON for the requested type.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store-specific failure.
    #[error("other: {0}")]
    Other(String),
}

/// Typed view over a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Raw document bytes. A missing key and an empty document both read as
    /// absent.
    fn document(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Decode the document under `key`; `Ok(None)` when absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.document(key)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(ConfigError::from))
            .transpose()
    }

    /// [`load`](Self::load), with `T::default()` standing in for an absent
    /// document. Decode failures still surface.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Encode `value` as pretty JSON and store it under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_and_empty_documents_are_absent() {
        let service = ConfigService::new(MapStore::default());
        assert_eq!(service.load::<u32>("k").unwrap(), None);
        service.store.save_raw("k", b"").unwrap();
        assert_eq!(service.load::<u32>("k").unwrap(), None);
        assert_eq!(service.load_or_default::<u32>("k").unwrap(), 0);
    }

    #[test]
    fn corrupt_document_is_not_defaulted() {
        let service = ConfigService::new(MapStore::default());
        service.store.save_raw("k", b"{not json").unwrap();
        assert!(matches!(
            service.load_or_default::<u32>("k"),
            Err(ConfigError::Serde(_))
        ));
    }
}
