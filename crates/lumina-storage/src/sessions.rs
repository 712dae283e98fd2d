use std::sync::Arc;

use lumina_core::models::session::SessionCounters;
use lumina_core::storage_keys;

use crate::error::StorageError;
use crate::kv::KeyValueStore;
use crate::state;

/// Durable storage for the per-subject session counters. The mapping is
/// written as a whole after every increment.
pub struct SessionCounterStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCounterStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted counters, defaulting to all-zero when absent.
    pub fn load(&self) -> Result<SessionCounters, StorageError> {
        Ok(state::load_state(self.store.as_ref(), storage_keys::SESSION_COUNTERS)?
            .unwrap_or_default())
    }

    pub fn save(&self, counters: &SessionCounters) -> Result<(), StorageError> {
        state::save_state(self.store.as_ref(), storage_keys::SESSION_COUNTERS, counters)
    }
}
