//! Error types for the user-preferences SDK.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreferencesError {
    #[error("preference not found")]
    NotFound,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("access denied")]
    Forbidden,

    #[error("authentication required")]
    Unauthenticated,

    #[error("Internal error")]
    Internal,
}

impl PreferencesError {
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }
}
