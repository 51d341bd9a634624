//! Axum extractor and middleware for bearer authentication

use crate::{context::SecurityContext, errors::AuthError, traits::TokenValidator};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, Method, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Subject used when authentication is bypassed and none is configured.
pub const DEFAULT_DEV_SUBJECT: &str = "dev-user";

/// How the middleware establishes the caller's identity.
#[derive(Clone)]
pub enum AuthMode {
    /// Require and verify a bearer token on every request.
    Verify(Arc<dyn TokenValidator>),
    /// Local development only: every request runs as `subject`.
    DevBypass { subject: String },
}

impl AuthMode {
    #[must_use]
    pub fn verify(validator: Arc<dyn TokenValidator>) -> Self {
        Self::Verify(validator)
    }

    /// Build the bypass mode. Logs a warning so the mode never goes unnoticed.
    #[must_use]
    pub fn dev_bypass(subject: Option<String>) -> Self {
        let subject = subject
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DEV_SUBJECT.to_owned());
        tracing::warn!(
            subject = %subject,
            "authentication is BYPASSED: every request runs as a fixed identity; never enable this in production"
        );
        Self::DevBypass { subject }
    }
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verify(_) => f.write_str("Verify"),
            Self::DevBypass { subject } => {
                f.debug_struct("DevBypass").field("subject", subject).finish()
            }
        }
    }
}

/// Extractor for `SecurityContext` - validates that auth middleware has run
#[derive(Debug, Clone)]
pub struct Authz(pub SecurityContext);

impl<S> FromRequestParts<S> for Authz
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Authz)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Authentication middleware.
///
/// CORS preflight passes straight through. Otherwise a `SecurityContext`
/// is attached to the request or the request is answered with 401.
pub async fn authenticate(
    State(mode): State<AuthMode>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_preflight_request(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let ctx = match &mode {
        AuthMode::DevBypass { subject } => SecurityContext::new(subject.clone()),
        AuthMode::Verify(validator) => {
            let token = match extract_bearer_token(request.headers()) {
                Ok(token) => token,
                Err(err) => return err.into_response(),
            };
            match validator.validate_and_parse(token).await {
                Ok(claims) => SecurityContext::from(&claims),
                Err(err) => return err.into_response(),
            }
        }
    };

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The value must split on its first space into exactly two parts and the
/// scheme is matched case-insensitively.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;
    if value.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidScheme),
    }
}

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(axum::http::header::ORIGIN)
        && headers.contains_key(axum::http::header::ACCESS_CONTROL_REQUEST_METHOD)
}
