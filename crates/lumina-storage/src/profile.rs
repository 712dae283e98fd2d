use std::sync::Arc;

use tracing::info;

use lumina_core::models::profile::UserProfile;
use lumina_core::storage_keys;

use crate::error::StorageError;
use crate::kv::KeyValueStore;
use crate::state;

/// Durable storage for the learner profile. The profile is written as a
/// whole on every save.
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<UserProfile>, StorageError> {
        state::load_state(self.store.as_ref(), storage_keys::USER_PROFILE)
    }

    pub fn save(&self, profile: &UserProfile) -> Result<(), StorageError> {
        state::save_state(self.store.as_ref(), storage_keys::USER_PROFILE, profile)?;
        info!(name = %profile.name, "profile saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(storage_keys::USER_PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn profile_round_trips() {
        let store = ProfileStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().unwrap().is_none());

        let profile = UserProfile::new("Ada");
        store.save(&profile).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), profile);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_the_whole_profile() {
        let store = ProfileStore::new(Arc::new(MemoryStore::new()));
        store.save(&UserProfile::new("Ada")).unwrap();
        let updated = UserProfile::with_avatar("Ada Lovelace", "data:image/jpeg;base64,ab");
        store.save(&updated).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), updated);
    }
}
