//! User Preferences Module Implementation
//!
//! The public API is defined in `user-preferences-sdk` and re-exported here.

pub use user_preferences_sdk::{Preferences, PreferencesError, UserPreferencesApi};

pub mod config;
pub mod local_client;

pub use config::{DynamoConfig, MAX_KEYS_PER_REQUEST, MAX_STORED_SET_BYTES, PreferencesConfig};
pub use local_client::LocalClient;

pub mod api;
pub mod domain;
pub mod infra;
