//! Layered server configuration.
//!
//! Defaults, then an optional YAML file, then the process environment,
//! then CLI flags. Environment variables use their bare names
//! (`JWT_SECRET`, `SERVER_PORT`, ...); YAML files use the same names in
//! lower case.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use prefstore_auth::ValidationConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use user_preferences::{DynamoConfig, PreferencesConfig};

/// Environment variables read by the server.
pub const ENV_VARS: [&str; 22] = [
    "JWT_SECRET",
    "JWT_ISSUER",
    "JWT_LEEWAY_SECONDS",
    "SERVER_HOST",
    "SERVER_PORT",
    "DYNAMODB_ENDPOINT",
    "DYNAMODB_TABLE_NAME",
    "DYNAMODB_CREATE_TABLE",
    "DYNAMODB_MAX_ATTEMPTS",
    "AWS_REGION",
    "CORS_ALLOW_ORIGIN",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "DEV_BYPASS_AUTH",
    "DEV_BYPASS_SUBJECT",
    "STORE_BACKEND",
    "REQUEST_TIMEOUT_SECONDS",
    "BODY_LIMIT_BYTES",
    "MAX_PREFERENCE_KEYS",
    "MAX_KEY_LENGTH",
    "MAX_VALUE_LENGTH",
    "MAX_PREFERENCES_BYTES",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET environment variable is required")]
    MissingSecret,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to load configuration: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Dynamodb,
    Memory,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing, deserialize_with = "lenient_secret")]
    pub jwt_secret: Option<SecretString>,
    pub jwt_issuer: Option<String>,
    pub jwt_leeway_seconds: i64,

    pub server_host: String,
    pub server_port: u16,
    pub request_timeout_seconds: u64,
    pub body_limit_bytes: usize,
    pub cors_allow_origin: String,

    pub store_backend: StoreBackend,
    pub dynamodb_endpoint: Option<String>,
    pub dynamodb_table_name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub dynamodb_create_table: bool,
    pub dynamodb_max_attempts: u32,
    pub aws_region: String,

    pub log_level: String,
    pub log_format: LogFormat,

    #[serde(deserialize_with = "lenient_bool")]
    pub dev_bypass_auth: bool,
    pub dev_bypass_subject: Option<String>,

    pub max_preference_keys: usize,
    pub max_key_length: usize,
    pub max_value_length: usize,
    pub max_preferences_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let bounds = PreferencesConfig::default();
        let dynamo = DynamoConfig::default();
        Self {
            jwt_secret: None,
            jwt_issuer: None,
            jwt_leeway_seconds: 0,
            server_host: "0.0.0.0".to_owned(),
            server_port: 8080,
            request_timeout_seconds: 10,
            body_limit_bytes: 64 * 1024,
            cors_allow_origin: "*".to_owned(),
            store_backend: StoreBackend::default(),
            dynamodb_endpoint: dynamo.endpoint,
            dynamodb_table_name: dynamo.table_name,
            dynamodb_create_table: dynamo.create_table,
            dynamodb_max_attempts: dynamo.max_attempts,
            aws_region: dynamo.region,
            log_level: "info".to_owned(),
            log_format: LogFormat::default(),
            dev_bypass_auth: false,
            dev_bypass_subject: None,
            max_preference_keys: bounds.max_preference_keys,
            max_key_length: bounds.max_key_length,
            max_value_length: bounds.max_value_length,
            max_preferences_bytes: bounds.max_total_bytes,
        }
    }
}

/// Defaults, optional YAML file, environment.
#[must_use]
pub fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = config_path {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::raw().only(&ENV_VARS))
}

impl AppConfig {
    /// Load from all layers except CLI flags.
    ///
    /// # Errors
    /// See [`AppConfig::from_figment`].
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&figment(config_path))
    }

    /// Extract, normalize and validate.
    ///
    /// # Errors
    /// `Figment` for unreadable or mistyped sources, `MissingSecret` when no
    /// signing secret is configured, `Invalid` for out-of-range values.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// CLI flags win over every other layer.
    pub fn apply_cli_overrides(&mut self, port: Option<u16>, mock: bool, verbose: u8) {
        if let Some(port) = port {
            self.server_port = port;
        }
        if mock {
            self.store_backend = StoreBackend::Memory;
        }
        match verbose {
            0 => {}
            1 => "info".clone_into(&mut self.log_level),
            2 => "debug".clone_into(&mut self.log_level),
            _ => "trace".clone_into(&mut self.log_level),
        }
    }

    // Empty strings from the environment mean "unset".
    fn normalize(&mut self) {
        for field in [
            &mut self.jwt_issuer,
            &mut self.dynamodb_endpoint,
            &mut self.dev_bypass_subject,
        ] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        if self
            .jwt_secret
            .as_ref()
            .is_some_and(|s| s.expose_secret().is_empty())
        {
            self.jwt_secret = None;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_none() {
            return Err(ConfigError::MissingSecret);
        }
        if self.jwt_leeway_seconds < 0 {
            return Err(ConfigError::Invalid(
                "JWT_LEEWAY_SECONDS must not be negative".to_owned(),
            ));
        }
        let zero = [
            ("DYNAMODB_MAX_ATTEMPTS", self.dynamodb_max_attempts == 0),
            ("REQUEST_TIMEOUT_SECONDS", self.request_timeout_seconds == 0),
            ("BODY_LIMIT_BYTES", self.body_limit_bytes == 0),
            ("MAX_PREFERENCE_KEYS", self.max_preference_keys == 0),
            ("MAX_KEY_LENGTH", self.max_key_length == 0),
            ("MAX_VALUE_LENGTH", self.max_value_length == 0),
            ("MAX_PREFERENCES_BYTES", self.max_preferences_bytes == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }
        self.preferences_config()
            .check_backend_limits()
            .map_err(ConfigError::Invalid)?;
        if self.cors_allow_origin.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "CORS_ALLOW_ORIGIN must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Signing secret; present after successful validation.
    ///
    /// # Errors
    /// `MissingSecret` if called on an unvalidated config without one.
    pub fn jwt_secret(&self) -> Result<&SecretString, ConfigError> {
        self.jwt_secret.as_ref().ok_or(ConfigError::MissingSecret)
    }

    #[must_use]
    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            allowed_issuers: self.jwt_issuer.iter().cloned().collect(),
            leeway_seconds: self.jwt_leeway_seconds,
            require_expiration: false,
        }
    }

    #[must_use]
    pub fn preferences_config(&self) -> PreferencesConfig {
        PreferencesConfig {
            max_preference_keys: self.max_preference_keys,
            max_key_length: self.max_key_length,
            max_value_length: self.max_value_length,
            max_total_bytes: self.max_preferences_bytes,
        }
    }

    #[must_use]
    pub fn dynamo_config(&self) -> DynamoConfig {
        DynamoConfig {
            table_name: self.dynamodb_table_name.clone(),
            region: self.aws_region.clone(),
            endpoint: self.dynamodb_endpoint.clone(),
            max_attempts: self.dynamodb_max_attempts,
            // Leave room inside the request deadline for the response.
            operation_timeout_secs: self.request_timeout_seconds.saturating_sub(1).max(1),
            create_table: self.dynamodb_create_table,
        }
    }

    /// Effective configuration as JSON with the secret masked.
    ///
    /// # Errors
    /// Only if serialization fails.
    pub fn to_redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            let masked = if self.jwt_secret.is_some() {
                serde_json::Value::from("***")
            } else {
                serde_json::Value::Null
            };
            obj.insert("jwt_secret".to_owned(), masked);
        }
        serde_json::to_string_pretty(&value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Uint(u) => u.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

// The environment layer types values on its own, so a numeric secret
// arrives as a number.
fn lenient_secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    let raw = Option::<Scalar>::deserialize(d)?;
    Ok(raw.map(|s| SecretString::from(s.into_text())))
}

// Anything other than a case-insensitive "true" is false.
fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Scalar::deserialize(d)? {
        Scalar::Bool(b) => b,
        other => other.into_text().eq_ignore_ascii_case("true"),
    })
}
