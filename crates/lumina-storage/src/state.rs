use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;
use crate::kv::KeyValueStore;

/// Load a JSON state value from the store. Returns `None` when the key is
/// absent.
pub fn load_state<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Save a JSON state value to the store, replacing any previous value.
pub fn save_state<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_string_pretty(value)?;
    store.set(key, &body)
}
