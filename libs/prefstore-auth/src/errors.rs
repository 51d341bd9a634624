use http::StatusCode;
use prefstore_errors::ApiError;
use thiserror::Error;

/// Authentication and authorization outcomes as a client sees them.
///
/// The display strings are the exact response messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingCredentials,

    #[error("invalid authorization header format")]
    InvalidScheme,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token missing subject claim")]
    MissingSubject,

    /// No identity was attached to the request at all.
    #[error("missing claims")]
    Unauthenticated,

    /// Identity is known but does not own the target resource.
    #[error("access denied")]
    Forbidden,
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::MissingCredentials
            | AuthError::InvalidScheme
            | AuthError::InvalidToken
            | AuthError::MissingSubject
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::new(err.status(), err.to_string())
    }
}

#[cfg(feature = "axum-ext")]
impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        ApiError::from(self).into_response()
    }
}
