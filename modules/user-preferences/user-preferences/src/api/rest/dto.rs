use serde::{Deserialize, Serialize};
use user_preferences_sdk::Preferences;

/// Body of every multi-key response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesDto {
    pub user_id: String,
    pub preferences: Preferences,
}

impl PreferencesDto {
    #[must_use]
    pub fn new(user_id: impl Into<String>, preferences: Preferences) -> Self {
        Self {
            user_id: user_id.into(),
            preferences,
        }
    }
}

/// Body of a single-key read.
#[derive(Debug, Serialize, Deserialize)]
pub struct PreferenceDto {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

impl HealthDto {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
        }
    }
}

/// Decode a write body: a flat JSON object of string values.
///
/// # Errors
/// Anything else, including an empty body, fails to decode.
pub fn decode_preferences(body: &[u8]) -> Result<Preferences, serde_json::Error> {
    serde_json::from_slice(body)
}
