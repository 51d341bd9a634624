use async_trait::async_trait;
use user_preferences_sdk::Preferences;

/// Failure of a store call.
///
/// `Unavailable` and `Malformed` surface to clients as the same opaque 500;
/// the split exists so logs tell an outage apart from a corrupted record.
/// `Rejected` means the request itself does not fit the store, such as a
/// merge that would grow a set past the item size limit.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable during {operation}")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed record during {operation}: {reason}")]
    Malformed {
        operation: &'static str,
        reason: String,
    },

    #[error("store rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

impl StoreError {
    #[must_use]
    pub fn unavailable(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable {
            operation,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            operation,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }

    /// Short label for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Malformed { .. } => "malformed",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Durable home of every user's preference set.
///
/// Each call touches exactly one user's record and is atomic at that
/// record. `None` from the reads means the set does not exist, which is
/// different from an existing empty set.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn get_all(&self, user_id: &str) -> Result<Option<Preferences>, StoreError>;

    /// `None` when the user or the key is absent.
    async fn get_one(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the whole set, creating it if needed. `Rejected` when the
    /// set would not fit the store.
    async fn replace_all(&self, user_id: &str, preferences: &Preferences)
    -> Result<(), StoreError>;

    /// Union `patch` into the set, creating it if needed, and return the
    /// resulting full set. Must not be a caller-side read-modify-write.
    /// `Rejected` when the merged set would not fit the store; the stored
    /// set is then left unchanged.
    async fn merge(&self, user_id: &str, patch: &Preferences) -> Result<Preferences, StoreError>;

    /// Idempotent.
    async fn delete_all(&self, user_id: &str) -> Result<(), StoreError>;

    /// Idempotent; never creates the set.
    async fn delete_key(&self, user_id: &str, key: &str) -> Result<(), StoreError>;
}
