//! Configuration for the user-preferences module.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Most entries one write may carry. A merge of this many keys keeps its
/// update expression under DynamoDB's 4 KB expression limit.
pub const MAX_KEYS_PER_REQUEST: usize = 200;

/// Largest stored set, counted as key bytes plus value bytes. Leaves room
/// under DynamoDB's 400 KB item limit for attribute names, the partition
/// key, timestamps and per-entry overhead.
pub const MAX_STORED_SET_BYTES: usize = 384 * 1024;

/// Request bounds enforced by the domain service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Entries one replace or merge request may carry.
    pub max_preference_keys: usize,
    /// Key length, counted in Unicode scalar values.
    pub max_key_length: usize,
    /// Value length in bytes.
    pub max_value_length: usize,
    /// Key bytes plus value bytes one replace or merge request may carry.
    pub max_total_bytes: usize,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            max_preference_keys: MAX_KEYS_PER_REQUEST,
            max_key_length: 128,
            max_value_length: 4096,
            max_total_bytes: 256 * 1024,
        }
    }
}

impl PreferencesConfig {
    /// Reject bounds the storage backends cannot honour.
    ///
    /// # Errors
    /// A message naming the first bound that is too large.
    pub fn check_backend_limits(&self) -> Result<(), String> {
        if self.max_preference_keys > MAX_KEYS_PER_REQUEST {
            return Err(format!(
                "max_preference_keys must be at most {MAX_KEYS_PER_REQUEST}"
            ));
        }
        if self.max_total_bytes > MAX_STORED_SET_BYTES {
            return Err(format!(
                "max_total_bytes must be at most {MAX_STORED_SET_BYTES}"
            ));
        }
        Ok(())
    }
}

/// DynamoDB client and table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    pub table_name: String,
    pub region: String,
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint: Option<String>,
    /// Attempts per call including the first; retries live in the SDK client.
    pub max_attempts: u32,
    /// Deadline for one backend call including its retries.
    pub operation_timeout_secs: u64,
    /// Create the table at startup when it does not exist.
    pub create_table: bool,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: "user-preferences".to_owned(),
            region: "us-east-1".to_owned(),
            endpoint: None,
            max_attempts: 3,
            operation_timeout_secs: 5,
            create_table: false,
        }
    }
}

impl DynamoConfig {
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}
