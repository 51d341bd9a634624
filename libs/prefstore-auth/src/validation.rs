use crate::{claims::Claims, claims_error::ClaimsError};
use time::OffsetDateTime;

/// Checks applied to claims after the signature has been verified.
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Allowed issuers. Empty means the issuer is not enforced; otherwise a
    /// token without `iss` is rejected too.
    pub allowed_issuers: Vec<String>,

    /// Leeway in seconds for time-based validations (exp, nbf)
    pub leeway_seconds: i64,

    /// Reject tokens that carry no `exp` claim.
    pub require_expiration: bool,
}

/// Perform the issuer and time-window checks on claims.
///
/// # Errors
/// Returns `ClaimsError` if any validation check fails.
pub fn validate_claims(claims: &Claims, config: &ValidationConfig) -> Result<(), ClaimsError> {
    if !config.allowed_issuers.is_empty() {
        let accepted = claims
            .issuer
            .as_ref()
            .is_some_and(|iss| config.allowed_issuers.contains(iss));
        if !accepted {
            return Err(ClaimsError::InvalidIssuer {
                expected: config.allowed_issuers.clone(),
                actual: claims.issuer.clone(),
            });
        }
    }

    let now = OffsetDateTime::now_utc();
    let leeway = time::Duration::seconds(config.leeway_seconds);

    match claims.expires_at {
        Some(exp) if now >= exp + leeway => return Err(ClaimsError::Expired),
        None if config.require_expiration => {
            return Err(ClaimsError::MissingClaim("exp".to_owned()));
        }
        _ => {}
    }

    if claims.not_before.is_some_and(|nbf| now < nbf - leeway) {
        return Err(ClaimsError::NotYetValid);
    }

    Ok(())
}

/// Helper to parse timestamp (seconds since epoch) into `OffsetDateTime`.
///
/// # Errors
/// Returns `ClaimsError::InvalidClaimFormat` if the value is not a valid unix timestamp.
pub fn parse_timestamp(
    value: &serde_json::Value,
    field_name: &str,
) -> Result<OffsetDateTime, ClaimsError> {
    // Some issuers emit fractional seconds.
    #[allow(clippy::cast_possible_truncation)]
    let ts = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
        .ok_or_else(|| ClaimsError::InvalidClaimFormat {
            field: field_name.to_owned(),
            reason: "must be a number (unix timestamp)".to_owned(),
        })?;

    OffsetDateTime::from_unix_timestamp(ts).map_err(|_| ClaimsError::InvalidClaimFormat {
        field: field_name.to_owned(),
        reason: "invalid unix timestamp".to_owned(),
    })
}

/// Helper to extract string from JSON value.
///
/// # Errors
/// Returns `ClaimsError::InvalidClaimFormat` if the value is not a string.
pub fn extract_string(value: &serde_json::Value, field_name: &str) -> Result<String, ClaimsError> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ClaimsError::InvalidClaimFormat {
            field: field_name.to_owned(),
            reason: "must be a string".to_owned(),
        })
}
