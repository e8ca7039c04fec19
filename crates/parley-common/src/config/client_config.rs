//! Client configuration structs
//!
//! Loads configuration from environment variables and config files.

use parley_core::Intents;
use serde::Deserialize;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Bot token used for both REST calls and the stream handshake
    pub token: String,
    #[serde(default)]
    pub intents: Intents,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Streaming connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Shard index carried in the Identify payload
    #[serde(default)]
    pub shard_id: u64,
    /// Total shard count carried in the Identify payload
    #[serde(default = "default_shard_total")]
    pub shard_total: u64,
    /// Member-count threshold above which the server omits offline members
    /// from guild snapshots
    #[serde(default = "default_large_threshold")]
    pub large_threshold: u32,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

/// Reconnect backoff settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,
    /// Upper bound on the retry delay in milliseconds
    #[serde(default = "default_backoff_cap_ms")]
    pub cap_ms: u64,
}

/// REST client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Internal retries after a 429 before the error surfaces to the caller
    #[serde(default = "default_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            shard_id: 0,
            shard_total: default_shard_total(),
            large_threshold: default_large_threshold(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            cap_ms: default_backoff_cap_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

// Default value functions
fn default_shard_total() -> u64 {
    1
}

fn default_large_threshold() -> u32 {
    250
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    60_000
}

fn default_base_url() -> String {
    "https://chat.example.com/api/v1".to_string()
}

fn default_user_agent() -> String {
    concat!("parley (", env!("CARGO_PKG_VERSION"), ")").to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_retries() -> u32 {
    1
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            gateway: GatewayConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from the environment
    ///
    /// Reads `PARLEY_*` variables (nested fields separated by `__`, e.g.
    /// `PARLEY_GATEWAY__SHARD_ID`), after loading a `.env` file if present.
    ///
    /// # Errors
    /// Returns an error if the token is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let cfg: Self = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("PARLEY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error for an empty or malformed token, or an out-of-range
    /// shard index.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Missing("token"));
        }
        if self.token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "token must not contain whitespace".to_string(),
            ));
        }
        if self.gateway.shard_total == 0 {
            return Err(ConfigError::Invalid(
                "gateway.shard_total must be at least 1".to_string(),
            ));
        }
        if self.gateway.shard_id >= self.gateway.shard_total {
            return Err(ConfigError::Invalid(format!(
                "gateway.shard_id {} out of range for {} shard(s)",
                self.gateway.shard_id, self.gateway.shard_total
            )));
        }
        if self.gateway.backoff.base_ms == 0 || self.gateway.backoff.cap_ms < self.gateway.backoff.base_ms {
            return Err(ConfigError::Invalid(
                "gateway.backoff cap must be >= base and base must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::new("abc123", Intents::default());
        assert_eq!(cfg.gateway.shard_id, 0);
        assert_eq!(cfg.gateway.shard_total, 1);
        assert_eq!(cfg.gateway.backoff.base_ms, 1_000);
        assert_eq!(cfg.gateway.backoff.cap_ms, 60_000);
        assert_eq!(cfg.http.max_rate_limit_retries, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let cfg = ClientConfig::new("  ", Intents::default());
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("token"))));
    }

    #[test]
    fn test_token_with_whitespace_rejected() {
        let cfg = ClientConfig::new("abc def", Intents::default());
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_shard_id_out_of_range() {
        let mut cfg = ClientConfig::new("abc", Intents::default());
        cfg.gateway.shard_id = 2;
        cfg.gateway.shard_total = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let cfg: ClientConfig = serde_json::from_str(
            r#"{"token":"abc","intents":1,"gateway":{"shard_id":1,"shard_total":4}}"#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.shard_total, 4);
        assert_eq!(cfg.gateway.large_threshold, 250);
        assert!(cfg.validate().is_ok());
    }
}
