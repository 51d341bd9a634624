use std::sync::Arc;

use prefstore_auth::{SecurityContext, authorize_owner};
use user_preferences_sdk::Preferences;

use super::error::DomainError;
use super::repo::{PreferencesRepository, StoreError};
use crate::config::PreferencesConfig;

pub struct Service {
    repo: Arc<dyn PreferencesRepository>,
    config: PreferencesConfig,
}

impl Service {
    #[must_use]
    pub fn new(repo: Arc<dyn PreferencesRepository>, config: PreferencesConfig) -> Self {
        Self { repo, config }
    }

    /// Full read. A user with no stored set gets an empty one.
    pub async fn get_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<Preferences, DomainError> {
        self.authorize(ctx, user_id)?;

        let found = self
            .repo
            .get_all(user_id)
            .await
            .map_err(|e| store_failure(e, "get_all", user_id, None))?;
        Ok(found.unwrap_or_default())
    }

    pub async fn get_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<String, DomainError> {
        self.authorize(ctx, user_id)?;
        self.validate_key(key)?;

        self.repo
            .get_one(user_id, key)
            .await
            .map_err(|e| store_failure(e, "get_one", user_id, Some(key)))?
            .ok_or(DomainError::NotFound)
    }

    /// Full replace. Returns the set as written.
    pub async fn replace_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<Preferences, DomainError> {
        self.authorize(ctx, user_id)?;
        self.validate_preferences(&preferences)?;

        self.repo
            .replace_all(user_id, &preferences)
            .await
            .map_err(|e| store_failure(e, "replace_all", user_id, None))?;
        Ok(preferences)
    }

    /// Merge. Returns the full set after the merge, as the store computed it.
    pub async fn merge_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Preferences, DomainError> {
        self.authorize(ctx, user_id)?;
        if patch.is_empty() {
            return Err(DomainError::validation("empty preferences"));
        }
        self.validate_preferences(&patch)?;

        self.repo
            .merge(user_id, &patch)
            .await
            .map_err(|e| store_failure(e, "merge", user_id, None))
    }

    pub async fn delete_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<(), DomainError> {
        self.authorize(ctx, user_id)?;

        self.repo
            .delete_all(user_id)
            .await
            .map_err(|e| store_failure(e, "delete_all", user_id, None))
    }

    pub async fn delete_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<(), DomainError> {
        self.authorize(ctx, user_id)?;
        self.validate_key(key)?;

        self.repo
            .delete_key(user_id, key)
            .await
            .map_err(|e| store_failure(e, "delete_key", user_id, Some(key)))
    }

    /// Target-user check shared by every operation: the path user must be
    /// present and must be the caller. Handlers run it before decoding a
    /// request body.
    pub fn authorize(&self, ctx: &SecurityContext, user_id: &str) -> Result<(), DomainError> {
        if user_id.is_empty() {
            return Err(DomainError::validation("missing userId"));
        }
        authorize_owner(ctx, user_id)?;
        Ok(())
    }

    fn validate_key(&self, key: &str) -> Result<(), DomainError> {
        if key.is_empty() {
            return Err(DomainError::validation("missing key"));
        }
        if key.chars().count() > self.config.max_key_length {
            return Err(DomainError::validation(format!(
                "key exceeds maximum length of {}",
                self.config.max_key_length
            )));
        }
        Ok(())
    }

    fn validate_preferences(&self, preferences: &Preferences) -> Result<(), DomainError> {
        if preferences.len() > self.config.max_preference_keys {
            return Err(DomainError::validation(format!(
                "too many preferences: at most {} allowed",
                self.config.max_preference_keys
            )));
        }
        if preferences.byte_size() > self.config.max_total_bytes {
            return Err(DomainError::validation(format!(
                "preferences exceed maximum total size of {} bytes",
                self.config.max_total_bytes
            )));
        }
        for (key, value) in preferences {
            self.validate_key(key)?;
            if value.len() > self.config.max_value_length {
                return Err(DomainError::validation(format!(
                    "value for '{key}' exceeds maximum length of {}",
                    self.config.max_value_length
                )));
            }
        }
        Ok(())
    }
}

/// Message for a write the store refused as too large.
pub const STORAGE_LIMIT_MESSAGE: &str = "preferences exceed storage limits";

fn store_failure(
    err: StoreError,
    operation: &'static str,
    user_id: &str,
    key: Option<&str>,
) -> DomainError {
    if let StoreError::Rejected { reason, .. } = &err {
        tracing::warn!(
            operation,
            user_id,
            key = key.unwrap_or_default(),
            reason = %reason,
            "preference store rejected request"
        );
        return DomainError::validation(STORAGE_LIMIT_MESSAGE);
    }
    tracing::error!(
        operation,
        user_id,
        key = key.unwrap_or_default(),
        kind = err.kind(),
        error = ?err,
        "preference store call failed"
    );
    DomainError::Store(err)
}
