//! `UserPreferencesApi` trait definition.
//!
//! Every method takes the caller's `SecurityContext`; the implementation
//! enforces that the caller owns `user_id`.

use async_trait::async_trait;
use prefstore_auth::SecurityContext;

use crate::errors::PreferencesError;
use crate::models::Preferences;

#[async_trait]
pub trait UserPreferencesApi: Send + Sync {
    /// All preferences of a user. A user with nothing stored gets an empty set.
    async fn get_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<Preferences, PreferencesError>;

    /// One value, or `NotFound`.
    async fn get_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<String, PreferencesError>;

    /// Replace the whole set (PUT semantics). Returns what was written.
    async fn replace_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<Preferences, PreferencesError>;

    /// Merge entries into the set (PATCH semantics). Returns the full merged set.
    async fn merge_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Preferences, PreferencesError>;

    /// Remove the whole set. Idempotent.
    async fn delete_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<(), PreferencesError>;

    /// Remove one key. Idempotent.
    async fn delete_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<(), PreferencesError>;
}
