//! Shared-secret (HMAC-SHA256) bearer token verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{
    claims::Claims,
    claims_error::ClaimsError,
    errors::AuthError,
    traits::TokenValidator,
    validation::{ValidationConfig, validate_claims},
};

/// Verifies HS256-signed JWTs against one shared secret.
pub struct Hs256Validator {
    key: DecodingKey,
    config: ValidationConfig,
}

impl Hs256Validator {
    #[must_use]
    pub fn new(secret: &SecretString, config: ValidationConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            config,
        }
    }

    /// Verify signature, algorithm and claims.
    ///
    /// # Errors
    /// Returns the detailed [`ClaimsError`] for whichever check failed first.
    pub fn verify(&self, token: &str) -> Result<Claims, ClaimsError> {
        let header = decode_header(token)
            .map_err(|e| ClaimsError::DecodeFailed(format!("Invalid JWT header: {e}")))?;

        // Pin the algorithm before touching the signature.
        if header.alg != Algorithm::HS256 {
            return Err(ClaimsError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let raw = self.decode_payload(token)?;
        let claims = Claims::from_payload(&raw)?;
        validate_claims(&claims, &self.config)?;
        Ok(claims)
    }

    fn decode_payload(&self, token: &str) -> Result<Value, ClaimsError> {
        let mut validation = Validation::new(Algorithm::HS256);

        // Time and issuer checks run in validate_claims
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&[] as &[&str]);

        decode::<Value>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => ClaimsError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => {
                    ClaimsError::UnsupportedAlgorithm("mismatched key algorithm".to_owned())
                }
                _ => ClaimsError::DecodeFailed(format!("JWT validation failed: {e}")),
            })
    }
}

#[async_trait]
impl TokenValidator for Hs256Validator {
    async fn validate_and_parse(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "bearer token rejected");
            AuthError::from(err)
        })
    }
}
