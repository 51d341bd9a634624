use async_trait::async_trait;
use prefstore_auth::SecurityContext;
use std::sync::Arc;
use user_preferences_sdk::{Preferences, PreferencesError, UserPreferencesApi};

use crate::domain::service::Service;

/// In-process implementation of the SDK trait over the domain service.
pub struct LocalClient {
    service: Arc<Service>,
}

impl LocalClient {
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl UserPreferencesApi for LocalClient {
    async fn get_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<Preferences, PreferencesError> {
        self.service
            .get_preferences(ctx, user_id)
            .await
            .map_err(Into::into)
    }

    async fn get_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<String, PreferencesError> {
        self.service
            .get_preference(ctx, user_id, key)
            .await
            .map_err(Into::into)
    }

    async fn replace_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<Preferences, PreferencesError> {
        self.service
            .replace_preferences(ctx, user_id, preferences)
            .await
            .map_err(Into::into)
    }

    async fn merge_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Preferences, PreferencesError> {
        self.service
            .merge_preferences(ctx, user_id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_preferences(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
    ) -> Result<(), PreferencesError> {
        self.service
            .delete_preferences(ctx, user_id)
            .await
            .map_err(Into::into)
    }

    async fn delete_preference(
        &self,
        ctx: &SecurityContext,
        user_id: &str,
        key: &str,
    ) -> Result<(), PreferencesError> {
        self.service
            .delete_preference(ctx, user_id, key)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreferencesConfig;
    use crate::infra::storage::InMemoryPreferencesRepository;

    fn client() -> Arc<dyn UserPreferencesApi> {
        let service = Service::new(
            Arc::new(InMemoryPreferencesRepository::new()),
            PreferencesConfig::default(),
        );
        Arc::new(LocalClient::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn test_round_trip_through_sdk_trait() {
        let api = client();
        let ctx = SecurityContext::new("carol");

        let patch: Preferences = [("theme", "light")].into_iter().collect();
        let merged = api.merge_preferences(&ctx, "carol", patch).await.unwrap();
        assert_eq!(merged.get("theme"), Some("light"));

        let value = api.get_preference(&ctx, "carol", "theme").await.unwrap();
        assert_eq!(value, "light");

        api.delete_preference(&ctx, "carol", "theme").await.unwrap();
        assert_eq!(
            api.get_preference(&ctx, "carol", "theme").await,
            Err(PreferencesError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_errors_are_mapped_to_sdk_errors() {
        let api = client();
        let ctx = SecurityContext::new("carol");

        assert_eq!(
            api.get_preferences(&ctx, "dave").await,
            Err(PreferencesError::Forbidden)
        );
        assert_eq!(
            api.merge_preferences(&ctx, "carol", Preferences::new()).await,
            Err(PreferencesError::validation("empty preferences"))
        );
    }
}
