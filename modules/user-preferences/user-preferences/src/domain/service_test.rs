#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::super::*;
    use async_trait::async_trait;
    use prefstore_auth::SecurityContext;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use user_preferences_sdk::Preferences;

    use crate::config::PreferencesConfig;
    use crate::infra::storage::memory_repo::InMemoryPreferencesRepository;
    use error::DomainError;
    use repo::{PreferencesRepository, StoreError};

    // Fails every call and counts how many reached it
    #[derive(Default)]
    struct FailingRepository {
        calls: AtomicUsize,
        malformed: bool,
    }

    impl FailingRepository {
        fn fail(&self, operation: &'static str) -> StoreError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.malformed {
                StoreError::malformed(operation, "preferences is not a map")
            } else {
                StoreError::unavailable(operation, anyhow::anyhow!("connection refused"))
            }
        }
    }

    #[async_trait]
    impl PreferencesRepository for FailingRepository {
        async fn get_all(&self, _user_id: &str) -> Result<Option<Preferences>, StoreError> {
            Err(self.fail("get_all"))
        }

        async fn get_one(&self, _user_id: &str, _key: &str) -> Result<Option<String>, StoreError> {
            Err(self.fail("get_one"))
        }

        async fn replace_all(
            &self,
            _user_id: &str,
            _preferences: &Preferences,
        ) -> Result<(), StoreError> {
            Err(self.fail("replace_all"))
        }

        async fn merge(
            &self,
            _user_id: &str,
            _patch: &Preferences,
        ) -> Result<Preferences, StoreError> {
            Err(self.fail("merge"))
        }

        async fn delete_all(&self, _user_id: &str) -> Result<(), StoreError> {
            Err(self.fail("delete_all"))
        }

        async fn delete_key(&self, _user_id: &str, _key: &str) -> Result<(), StoreError> {
            Err(self.fail("delete_key"))
        }
    }

    fn memory_service() -> service::Service {
        service::Service::new(
            Arc::new(InMemoryPreferencesRepository::new()),
            PreferencesConfig::default(),
        )
    }

    fn prefs(pairs: &[(&str, &str)]) -> Preferences {
        pairs.iter().copied().collect()
    }

    fn alice() -> SecurityContext {
        SecurityContext::new("alice")
    }

    #[tokio::test]
    async fn test_unknown_user_reads_empty_and_not_found() {
        let svc = memory_service();

        let all = svc.get_preferences(&alice(), "alice").await.unwrap();
        assert!(all.is_empty());

        let one = svc.get_preference(&alice(), "alice", "theme").await;
        assert!(matches!(one, Err(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn test_replace_merge_delete_scenario() {
        let svc = memory_service();
        let ctx = alice();

        let written = svc
            .replace_preferences(&ctx, "alice", prefs(&[("theme", "dark"), ("lang", "en")]))
            .await
            .unwrap();
        assert_eq!(written.len(), 2);

        let merged = svc
            .merge_preferences(&ctx, "alice", prefs(&[("lang", "fr")]))
            .await
            .unwrap();
        assert_eq!(merged, prefs(&[("theme", "dark"), ("lang", "fr")]));

        svc.delete_preference(&ctx, "alice", "theme").await.unwrap();
        // Deleting again is a no-op
        svc.delete_preference(&ctx, "alice", "theme").await.unwrap();

        let all = svc.get_preferences(&ctx, "alice").await.unwrap();
        assert_eq!(all, prefs(&[("lang", "fr")]));

        svc.delete_preferences(&ctx, "alice").await.unwrap();
        svc.delete_preferences(&ctx, "alice").await.unwrap();
        assert!(svc.get_preferences(&ctx, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden_before_store() {
        let repo = Arc::new(FailingRepository::default());
        let svc = service::Service::new(repo.clone(), PreferencesConfig::default());
        let ctx = alice();

        assert!(matches!(
            svc.get_preferences(&ctx, "bob").await,
            Err(DomainError::Forbidden)
        ));
        assert!(matches!(
            svc.merge_preferences(&ctx, "bob", prefs(&[("a", "b")])).await,
            Err(DomainError::Forbidden)
        ));
        assert!(matches!(
            svc.delete_preference(&ctx, "bob", "a").await,
            Err(DomainError::Forbidden)
        ));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_user_id_is_validation_error() {
        let svc = memory_service();
        let result = svc.get_preferences(&alice(), "").await;
        assert!(
            matches!(result, Err(DomainError::Validation { ref message }) if message == "missing userId")
        );
    }

    #[tokio::test]
    async fn test_empty_merge_is_rejected() {
        let svc = memory_service();
        let result = svc
            .merge_preferences(&alice(), "alice", Preferences::new())
            .await;
        assert!(
            matches!(result, Err(DomainError::Validation { ref message }) if message == "empty preferences")
        );
    }

    #[tokio::test]
    async fn test_empty_replace_is_allowed() {
        let svc = memory_service();
        let ctx = alice();
        svc.replace_preferences(&ctx, "alice", prefs(&[("a", "1")]))
            .await
            .unwrap();
        svc.replace_preferences(&ctx, "alice", Preferences::new())
            .await
            .unwrap();
        assert!(svc.get_preferences(&ctx, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bounds_are_enforced() {
        let svc = service::Service::new(
            Arc::new(InMemoryPreferencesRepository::new()),
            PreferencesConfig {
                max_preference_keys: 2,
                max_key_length: 4,
                max_value_length: 3,
                ..PreferencesConfig::default()
            },
        );
        let ctx = alice();

        let too_many = prefs(&[("a", "1"), ("b", "2"), ("c", "3")]);
        assert!(matches!(
            svc.replace_preferences(&ctx, "alice", too_many).await,
            Err(DomainError::Validation { .. })
        ));

        let long_key = prefs(&[("abcde", "1")]);
        assert!(matches!(
            svc.merge_preferences(&ctx, "alice", long_key).await,
            Err(DomainError::Validation { .. })
        ));

        // Four scalar values, more than four bytes
        let unicode_key = prefs(&[("ключ", "1")]);
        assert!(
            svc.merge_preferences(&ctx, "alice", unicode_key)
                .await
                .is_ok()
        );

        let long_value = prefs(&[("a", "1234")]);
        assert!(matches!(
            svc.replace_preferences(&ctx, "alice", long_value).await,
            Err(DomainError::Validation { .. })
        ));

        assert!(matches!(
            svc.get_preference(&ctx, "alice", "").await,
            Err(DomainError::Validation { ref message }) if message == "missing key"
        ));
    }

    #[tokio::test]
    async fn test_request_total_size_is_bounded() {
        let svc = service::Service::new(
            Arc::new(InMemoryPreferencesRepository::new()),
            PreferencesConfig {
                max_total_bytes: 10,
                ..PreferencesConfig::default()
            },
        );
        let ctx = alice();

        let fits = prefs(&[("ab", "cd"), ("ef", "ghij")]);
        assert!(svc.replace_preferences(&ctx, "alice", fits).await.is_ok());

        let too_big = prefs(&[("ab", "cd"), ("ef", "ghijk")]);
        assert!(matches!(
            svc.merge_preferences(&ctx, "alice", too_big).await,
            Err(DomainError::Validation { ref message }) if message.contains("maximum total size")
        ));
    }

    #[tokio::test]
    async fn test_merges_growing_set_past_store_limit_are_validation_errors() {
        let svc = service::Service::new(
            Arc::new(InMemoryPreferencesRepository::with_max_set_bytes(12)),
            PreferencesConfig::default(),
        );
        let ctx = alice();

        svc.merge_preferences(&ctx, "alice", prefs(&[("a", "12345")]))
            .await
            .unwrap();
        let result = svc
            .merge_preferences(&ctx, "alice", prefs(&[("b", "67890")]))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { ref message }) if message == service::STORAGE_LIMIT_MESSAGE
        ));

        let stored = svc.get_preferences(&ctx, "alice").await.unwrap();
        assert_eq!(stored, prefs(&[("a", "12345")]));
    }

    #[tokio::test]
    async fn test_store_failures_surface_as_store_errors() {
        let svc = service::Service::new(
            Arc::new(FailingRepository::default()),
            PreferencesConfig::default(),
        );
        let result = svc.get_preferences(&alice(), "alice").await;
        match result {
            Err(DomainError::Store(err)) => assert_eq!(err.kind(), "unavailable"),
            other => panic!("expected store error, got {other:?}"),
        }

        let svc = service::Service::new(
            Arc::new(FailingRepository {
                malformed: true,
                ..Default::default()
            }),
            PreferencesConfig::default(),
        );
        let result = svc.delete_preference(&alice(), "alice", "k").await;
        match result {
            Err(DomainError::Store(err)) => assert_eq!(err.kind(), "malformed"),
            other => panic!("expected store error, got {other:?}"),
        }
    }

    #[test]
    fn test_domain_error_to_sdk_error() {
        use user_preferences_sdk::PreferencesError;

        assert_eq!(
            PreferencesError::from(DomainError::NotFound),
            PreferencesError::NotFound
        );
        assert_eq!(
            PreferencesError::from(DomainError::Forbidden),
            PreferencesError::Forbidden
        );
        assert_eq!(
            PreferencesError::from(DomainError::Store(StoreError::malformed("merge", "bad"))),
            PreferencesError::Internal
        );
    }

    #[test]
    fn test_only_owner_mismatch_is_forbidden() {
        use prefstore_auth::AuthError;
        use user_preferences_sdk::PreferencesError;

        assert!(matches!(
            DomainError::from(AuthError::Forbidden),
            DomainError::Forbidden
        ));
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidScheme,
            AuthError::InvalidToken,
            AuthError::MissingSubject,
            AuthError::Unauthenticated,
        ] {
            let domain = DomainError::from(err.clone());
            assert!(
                matches!(domain, DomainError::Unauthenticated(ref inner) if *inner == err),
                "{err}"
            );
            assert_eq!(
                PreferencesError::from(domain),
                PreferencesError::Unauthenticated
            );
        }
    }
}
