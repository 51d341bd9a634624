use thiserror::Error;

use crate::errors::AuthError;

/// Why a bearer token was not accepted.
///
/// Carries enough detail for logs. Clients only ever see the coarse
/// [`AuthError`] it converts into.
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Invalid signature or key")]
    InvalidSignature,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("JWT decode failed: {0}")]
    DecodeFailed(String),

    #[error("Invalid issuer: expected one of {expected:?}, got {actual:?}")]
    InvalidIssuer {
        expected: Vec<String>,
        actual: Option<String>,
    },

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid (nbf check failed)")]
    NotYetValid,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Invalid claim format: {field} - {reason}")]
    InvalidClaimFormat { field: String, reason: String },
}

impl From<ClaimsError> for AuthError {
    fn from(err: ClaimsError) -> Self {
        match err {
            ClaimsError::MissingClaim(claim) if claim == "sub" => AuthError::MissingSubject,
            _ => AuthError::InvalidToken,
        }
    }
}
