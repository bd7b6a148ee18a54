// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted tool settings.
//!
//! [`ConfigStore`] moves opaque blobs by key; [`ConfigService`] layers JSON on
//! top and knows where [`ControllerSettings`] live. Filesystem stores use keys
//! as file stems, so a key must be a plain name that does not start with `.`.

use rig_hierarchy::sanitize_name;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::settings::{ControllerSettings, CONTROLLER_SETTINGS_KEY};

/// Storage port for raw config blobs.
pub trait ConfigStore {
    /// Blob stored under `key`; [`ConfigError::NotFound`] when absent.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces the blob stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Config failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("not found")]
    NotFound,
    /// Key is empty or not a plain name.
    #[error("invalid config key '{0}'")]
    InvalidKey(String),
    /// Storage I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes do not decode to the requested type.
    #[error("config entry '{key}' is malformed: {source}")]
    Malformed {
        /// Offending key.
        key: String,
        /// Decoder error.
        source: serde_json::Error,
    },
    /// Value could not be encoded.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store-specific failure.
    #[error("other: {0}")]
    Other(String),
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() || key.starts_with('.') || sanitize_name(key, false) != key {
        return Err(ConfigError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// JSON view over a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwraps the store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Value stored under `key`; `Ok(None)` when missing or blank.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        check_key(key)?;
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes).map(Some).map_err(|source| {
            warn!(key, %source, "malformed config entry");
            ConfigError::Malformed {
                key: key.to_owned(),
                source,
            }
        })
    }

    /// Stores `value` under `key` as pretty JSON.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        check_key(key)?;
        let mut data = serde_json::to_vec_pretty(value)?;
        data.push(b'\n');
        self.store.save_raw(key, &data)
    }

    /// Loads (or defaults) the value under `key`, applies `edit` and stores
    /// the result, which is also returned.
    pub fn update<T, F>(&self, key: &str, edit: F) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T),
    {
        let mut value = self.load(key)?.unwrap_or_default();
        edit(&mut value);
        self.save(key, &value)?;
        Ok(value)
    }

    /// Stored controller settings, or the defaults when none are stored.
    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        Ok(self.load(CONTROLLER_SETTINGS_KEY)?.unwrap_or_default())
    }

    /// Persists controller settings.
    pub fn save_controller_settings(&self, settings: &ControllerSettings) -> Result<(), ConfigError> {
        self.save(CONTROLLER_SETTINGS_KEY, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MapStore {
        blobs: RefCell<BTreeMap<String, Vec<u8>>>,
        loads: RefCell<usize>,
    }

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            *self.loads.borrow_mut() += 1;
            self.blobs.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.blobs.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    fn put(service: &ConfigService<MapStore>, key: &str, data: &[u8]) {
        service.store().save_raw(key, data).unwrap();
    }

    #[test]
    fn keys_must_be_plain_names() {
        let service = ConfigService::new(MapStore::default());
        for key in ["", "..", ".hidden", "a/b", "Arm:Root"] {
            assert!(
                matches!(service.load::<u32>(key), Err(ConfigError::InvalidKey(_))),
                "{key:?} accepted"
            );
        }
        assert_eq!(*service.store().loads.borrow(), 0);
        assert!(service.save("rig_cli.v1", &1_u32).is_ok());
    }

    #[test]
    fn blank_entries_read_as_missing() {
        let service = ConfigService::new(MapStore::default());
        put(&service, "controller", b"  \n");
        assert_eq!(
            service.controller_settings().unwrap(),
            ControllerSettings::default()
        );
    }

    #[test]
    fn malformed_entries_name_their_key() {
        let service = ConfigService::new(MapStore::default());
        put(&service, "controller", b"{ nope");
        let err = service.controller_settings().unwrap_err();
        assert!(matches!(&err, ConfigError::Malformed { key, .. } if key == "controller"));
        assert!(err.to_string().starts_with("config entry 'controller' is malformed"));
    }

    #[test]
    fn update_edits_and_persists() {
        let service = ConfigService::new(MapStore::default());
        let settings: ControllerSettings = service
            .update(CONTROLLER_SETTINGS_KEY, |s: &mut ControllerSettings| {
                s.auto_resolve_secondary = false;
            })
            .unwrap();
        assert!(!settings.auto_resolve_secondary);
        assert_eq!(service.controller_settings().unwrap(), settings);
        let stored = service.into_inner().blobs.into_inner();
        assert!(stored["controller"].ends_with(b"}\n"));
    }
}
