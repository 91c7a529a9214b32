//! # Client Configuration
//!
//! Settings for the API connection and the POS screens.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     OPTICA_API_URL=https://api.optica.mx/api                           │
//! │     OPTICA_API_TOKEN=...                                               │
//! │     OPTICA_TIMEOUT_SECS=20                                             │
//! │     OPTICA_RESET_DISCOUNTS=true                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/optica-pos/client.toml (Linux)                           │
//! │     ~/Library/Application Support/com.optica.optica-pos/client.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://127.0.0.1:8000/api, 12 s timeout                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # client.toml
//! [api]
//! base_url = "http://127.0.0.1:8000/api"
//! timeout_secs = 12
//! # token = "..."   # usually set after login instead
//!
//! [pos]
//! reset_discounts_after_checkout = false
//! counter_customer_name = "Mostrador"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use optica_core::COUNTER_CUSTOMER_NAME;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// API Settings
// =============================================================================

/// Connection settings for [`RestBackend`](crate::rest::RestBackend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bearer token. Usually absent on disk and set after login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout() -> u64 {
    12
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token: None,
        }
    }
}

// =============================================================================
// POS Settings
// =============================================================================

/// Behaviour of the sale and order screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosConfig {
    /// Clear discount mode and percentages after a successful checkout.
    #[serde(default)]
    pub reset_discounts_after_checkout: bool,

    /// Customer name sent when the cashier leaves the field blank.
    #[serde(default = "default_counter_name")]
    pub counter_customer_name: String,
}

fn default_counter_name() -> String {
    COUNTER_CUSTOMER_NAME.to_string()
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            reset_discounts_after_checkout: false,
            counter_customer_name: default_counter_name(),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pos: PosConfig,
}

impl ClientConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from TOML file if it exists
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.pos.counter_customer_name.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "counter_customer_name must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `OPTICA_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("OPTICA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("OPTICA_API_TOKEN") {
            self.api.token = Some(token).filter(|t| !t.is_empty());
        }

        if let Some(timeout) = lookup("OPTICA_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid OPTICA_TIMEOUT_SECS"),
            }
        }

        if let Some(reset) = lookup("OPTICA_RESET_DISCOUNTS") {
            match reset.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.pos.reset_discounts_after_checkout = true,
                "0" | "false" | "no" => self.pos.reset_discounts_after_checkout = false,
                _ => warn!(value = %reset, "Ignoring invalid OPTICA_RESET_DISCOUNTS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "optica", "optica-pos")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.api.timeout_secs, 12);
        assert!(config.api.token.is_none());
        assert!(!config.pos.reset_discounts_after_checkout);
        assert_eq!(config.pos.counter_customer_name, "Mostrador");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.api.base_url = "ws://localhost:8000".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "no es url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "https://api.optica.mx/api".to_string();
        assert!(config.validate().is_ok());

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [pos]
            reset_discounts_after_checkout = true
            "#,
        )
        .unwrap();

        assert!(config.pos.reset_discounts_after_checkout);
        assert_eq!(config.pos.counter_customer_name, "Mostrador");
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn test_older_files_with_currency_key_still_load() {
        let config: ClientConfig = toml::from_str(
            r#"
            [pos]
            counter_customer_name = "Público general"
            currency_code = "MXN"
            "#,
        )
        .unwrap();

        assert_eq!(config.pos.counter_customer_name, "Público general");
        let written = toml::to_string_pretty(&config).unwrap();
        assert!(!written.contains("currency_code"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPTICA_API_URL", "https://api.optica.mx/api"),
            ("OPTICA_API_TOKEN", "abc"),
            ("OPTICA_TIMEOUT_SECS", "nope"),
            ("OPTICA_RESET_DISCOUNTS", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://api.optica.mx/api");
        assert_eq!(config.api.token.as_deref(), Some("abc"));
        assert_eq!(config.api.timeout_secs, 12);
        assert!(config.pos.reset_discounts_after_checkout);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("optica-pos-missing-client.toml");
        let config = ClientConfig::load_or_default(Some(path));
        assert_eq!(config.pos, PosConfig::default());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[pos]"));
        assert!(!toml_str.contains("token"));
    }
}
