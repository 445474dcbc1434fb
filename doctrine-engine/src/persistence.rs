//! Save and load of the progress store through a host key-value store.
use log::{debug, warn};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::PersistenceError;
use crate::progress::ProgressStore;

pub const UNLOCKED_DOCTRINES_KEY: &str = "unlocked_doctrines";
pub const FEAT_PROGRESS_KEY: &str = "feat_progress";

/// Host-side storage addressed by string key.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Option<Value>;

    /// # Errors
    ///
    /// Returns an error if the host rejects the write.
    fn write(&mut self, key: &str, value: Value) -> Result<(), PersistenceError>;
}

/// In-memory store used by tests and the tester binary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Write the two progress entries.
///
/// # Errors
///
/// Returns an error if encoding fails or the store rejects a write.
pub fn save(store: &ProgressStore, kv: &mut dyn KeyValueStore) -> Result<(), PersistenceError> {
    let unlocked = serde_json::to_value(store.unlocked_list()).map_err(|source| {
        PersistenceError::Codec {
            key: UNLOCKED_DOCTRINES_KEY,
            source,
        }
    })?;
    let progress = serde_json::to_value(store.feat_progress_map()).map_err(|source| {
        PersistenceError::Codec {
            key: FEAT_PROGRESS_KEY,
            source,
        }
    })?;
    kv.write(UNLOCKED_DOCTRINES_KEY, unlocked)?;
    kv.write(FEAT_PROGRESS_KEY, progress)?;
    debug!(
        "saved {} unlocked doctrines, {} progress entries",
        store.unlocked().count(),
        store.feat_progress_map().len()
    );
    Ok(())
}

/// Read the two progress entries; missing entries load as empty.
///
/// # Errors
///
/// Returns an error if a present entry has the wrong shape.
pub fn load(kv: &dyn KeyValueStore) -> Result<ProgressStore, PersistenceError> {
    let unlocked: Vec<String> = decode(kv, UNLOCKED_DOCTRINES_KEY)?;
    let feat_progress: BTreeMap<String, i32> = decode(kv, FEAT_PROGRESS_KEY)?;
    Ok(ProgressStore::from_parts(unlocked, feat_progress))
}

fn decode<T>(kv: &dyn KeyValueStore, key: &'static str) -> Result<T, PersistenceError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match kv.read(key) {
        None | Some(Value::Null) => {
            warn!("no {key} entry; starting empty");
            Ok(T::default())
        }
        Some(value) => {
            serde_json::from_value(value).map_err(|source| PersistenceError::Codec { key, source })
        }
    }
}
