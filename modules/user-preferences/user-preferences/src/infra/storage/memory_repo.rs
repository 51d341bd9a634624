use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use user_preferences_sdk::Preferences;

use crate::config::MAX_STORED_SET_BYTES;
use crate::domain::repo::{PreferencesRepository, StoreError};

/// Process-local store for tests and `--mock` runs.
///
/// Every operation runs under the shard lock of the user's entry, so
/// concurrent merges for one user serialize and none are lost, while
/// different users rarely contend. Sets are capped at the same size the
/// DynamoDB backend can hold.
#[derive(Debug)]
pub struct InMemoryPreferencesRepository {
    sets: DashMap<String, Preferences>,
    max_set_bytes: usize,
}

impl Default for InMemoryPreferencesRepository {
    fn default() -> Self {
        Self::with_max_set_bytes(MAX_STORED_SET_BYTES)
    }
}

impl InMemoryPreferencesRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_set_bytes(max_set_bytes: usize) -> Self {
        Self {
            sets: DashMap::new(),
            max_set_bytes,
        }
    }

    fn check_size(&self, operation: &'static str, set: &Preferences) -> Result<(), StoreError> {
        let size = set.byte_size();
        if size > self.max_set_bytes {
            return Err(StoreError::rejected(
                operation,
                format!("set of {size} bytes exceeds {} bytes", self.max_set_bytes),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryPreferencesRepository {
    async fn get_all(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        Ok(self.sets.get(user_id).map(|set| set.value().clone()))
    }

    async fn get_one(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .sets
            .get(user_id)
            .and_then(|set| set.get(key).map(ToOwned::to_owned)))
    }

    async fn replace_all(
        &self,
        user_id: &str,
        preferences: &Preferences,
    ) -> Result<(), StoreError> {
        self.check_size("replace_all", preferences)?;
        self.sets.insert(user_id.to_owned(), preferences.clone());
        Ok(())
    }

    async fn merge(&self, user_id: &str, patch: &Preferences) -> Result<Preferences, StoreError> {
        match self.sets.entry(user_id.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let mut merged = occupied.get().clone();
                merged.merge(patch.clone());
                self.check_size("merge", &merged)?;
                occupied.insert(merged.clone());
                Ok(merged)
            }
            Entry::Vacant(vacant) => {
                self.check_size("merge", patch)?;
                vacant.insert(patch.clone());
                Ok(patch.clone())
            }
        }
    }

    async fn delete_all(&self, user_id: &str) -> Result<(), StoreError> {
        self.sets.remove(user_id);
        Ok(())
    }

    async fn delete_key(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        if let Some(mut set) = self.sets.get_mut(user_id) {
            set.remove(key);
        }
        Ok(())
    }
}
