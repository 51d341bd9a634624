use serde_json::Value;
use time::OffsetDateTime;

use crate::claims_error::ClaimsError;
use crate::validation::{extract_string, parse_timestamp};

/// Verified token claims: the subject plus what validation checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject - the `sub` claim. See <https://datatracker.ietf.org/doc/html/rfc7519#section-4.1.2>
    pub subject: String,

    /// Issuer - the `iss` claim. See <https://datatracker.ietf.org/doc/html/rfc7519#section-4.1.1>
    pub issuer: Option<String>,

    /// Expiration time - the `exp` claim.
    pub expires_at: Option<OffsetDateTime>,

    /// Not before time - the `nbf` claim.
    pub not_before: Option<OffsetDateTime>,
}

impl Claims {
    /// Normalize a decoded JWT payload. Claims other than `sub`, `iss`,
    /// `exp` and `nbf` are ignored.
    ///
    /// # Errors
    /// `MissingClaim("sub")` when the subject is absent or empty,
    /// `InvalidClaimFormat` when one of those claims has the wrong JSON type.
    pub fn from_payload(raw: &Value) -> Result<Self, ClaimsError> {
        let subject = raw
            .get("sub")
            .filter(|v| !v.is_null())
            .ok_or_else(|| ClaimsError::MissingClaim("sub".to_owned()))
            .and_then(|v| extract_string(v, "sub"))?;
        if subject.is_empty() {
            return Err(ClaimsError::MissingClaim("sub".to_owned()));
        }

        let issuer = raw
            .get("iss")
            .filter(|v| !v.is_null())
            .map(|v| extract_string(v, "iss"))
            .transpose()?;

        let expires_at = raw
            .get("exp")
            .map(|v| parse_timestamp(v, "exp"))
            .transpose()?;
        let not_before = raw
            .get("nbf")
            .map(|v| parse_timestamp(v, "nbf"))
            .transpose()?;

        Ok(Self {
            subject,
            issuer,
            expires_at,
            not_before,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_checked_claims_and_ignores_the_rest() {
        let raw = json!({
            "sub": "alice",
            "iss": "https://issuer.example",
            "aud": "prefs",
            "exp": 4_102_444_800_i64,
            "iat": "not checked",
            "email": "alice@example.com"
        });

        let claims = Claims::from_payload(&raw).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.issuer.as_deref(), Some("https://issuer.example"));
        assert_eq!(
            claims.expires_at.map(OffsetDateTime::unix_timestamp),
            Some(4_102_444_800)
        );
        assert!(claims.not_before.is_none());
    }

    #[test]
    fn missing_or_empty_subject() {
        for raw in [json!({}), json!({"sub": ""}), json!({"sub": null})] {
            let err = Claims::from_payload(&raw).unwrap_err();
            assert!(matches!(err, ClaimsError::MissingClaim(ref c) if c == "sub"));
        }
    }

    #[test]
    fn non_string_subject_is_invalid_format() {
        let err = Claims::from_payload(&json!({"sub": 42})).unwrap_err();
        assert!(matches!(err, ClaimsError::InvalidClaimFormat { ref field, .. } if field == "sub"));
    }

    #[test]
    fn non_numeric_exp_is_invalid_format() {
        let err = Claims::from_payload(&json!({"sub": "a", "exp": "tomorrow"})).unwrap_err();
        assert!(matches!(err, ClaimsError::InvalidClaimFormat { ref field, .. } if field == "exp"));
    }

    #[test]
    fn fractional_timestamps_are_truncated() {
        let claims = Claims::from_payload(&json!({"sub": "a", "nbf": 1_000.9})).unwrap();
        assert_eq!(claims.not_before.map(OffsetDateTime::unix_timestamp), Some(1_000));
    }
}
