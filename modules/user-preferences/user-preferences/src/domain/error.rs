use prefstore_auth::AuthError;
use user_preferences_sdk::PreferencesError;

use super::repo::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("preference not found")]
    NotFound,

    #[error("{message}")]
    Validation { message: String },

    #[error("access denied")]
    Forbidden,

    /// The caller's identity could not be established.
    #[error(transparent)]
    Unauthenticated(AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<AuthError> for DomainError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden => Self::Forbidden,
            other => Self::Unauthenticated(other),
        }
    }
}

impl From<DomainError> for PreferencesError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => Self::not_found(),
            DomainError::Validation { message } => Self::validation(message),
            DomainError::Forbidden => Self::forbidden(),
            DomainError::Unauthenticated(_) => Self::unauthenticated(),
            DomainError::Store(_) => Self::internal(),
        }
    }
}
