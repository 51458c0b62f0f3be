//! Configuration model.
//!
//! Every field has a default so a missing or partial `config.toml` still
//! yields a usable configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cart::DEFAULT_STALENESS_HORIZON_HOURS;
use crate::channel::ReconnectPolicy;
use crate::error::{Result, StorefrontError};

/// Smallest reconnect delay the configuration accepts.
pub const MIN_RECONNECT_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorefrontConfig {
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    pub cart: CartConfig,
    pub storage: StorageConfig,
}

/// REST backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws/notifications".to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    pub staleness_horizon_hours: i64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            staleness_horizon_hours: DEFAULT_STALENESS_HORIZON_HOURS,
        }
    }
}

impl CartConfig {
    /// The horizon as a duration. Out-of-range values fall back to the default.
    pub fn staleness_horizon(&self) -> Duration {
        Duration::try_hours(self.staleness_horizon_hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_STALENESS_HORIZON_HOURS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the durable store. `None` means the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorefrontConfig {
    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(StorefrontError::config("api.base_url must not be empty"));
        }
        if self.channel.url.trim().is_empty() {
            return Err(StorefrontError::config("channel.url must not be empty"));
        }
        if self.cart.staleness_horizon_hours <= 0 {
            return Err(StorefrontError::config(
                "cart.staleness_horizon_hours must be positive",
            ));
        }
        if Duration::try_hours(self.cart.staleness_horizon_hours).is_none() {
            return Err(StorefrontError::config(format!(
                "cart.staleness_horizon_hours is out of range: {}",
                self.cart.staleness_horizon_hours
            )));
        }
        if self.channel.reconnect.initial_delay_ms < MIN_RECONNECT_DELAY_MS {
            return Err(StorefrontError::config(format!(
                "channel.reconnect.initial_delay_ms must be at least {}",
                MIN_RECONNECT_DELAY_MS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = StorefrontConfig::from_toml_str("").unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.cart.staleness_horizon(), Duration::hours(24));
        assert_eq!(config.channel.reconnect.initial_delay_ms, 5_000);
    }

    #[test]
    fn test_partial_toml() {
        let config = StorefrontConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://shop.example.com/api"

            [channel.reconnect]
            multiplier = 1.0
            jitter = false
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://shop.example.com/api");
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.channel.reconnect.multiplier, 1.0);
        assert_eq!(config.channel.reconnect.max_delay_ms, 60_000);
    }

    #[test]
    fn test_validation() {
        let err = StorefrontConfig::from_toml_str("[cart]\nstaleness_horizon_hours = 0").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_huge_staleness_horizon_is_rejected() {
        let err = StorefrontConfig::from_toml_str(
            "[cart]\nstaleness_horizon_hours = 9223372036854775807",
        )
        .unwrap_err();
        assert!(err.is_config());

        let cart = CartConfig {
            staleness_horizon_hours: i64::MAX,
        };
        assert_eq!(cart.staleness_horizon(), Duration::hours(24));
    }

    #[test]
    fn test_zero_reconnect_delay_is_rejected() {
        let err =
            StorefrontConfig::from_toml_str("[channel.reconnect]\ninitial_delay_ms = 0").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_toml_roundtrip_keeps_sections() {
        let text = StorefrontConfig::default().to_toml_string().unwrap();
        assert!(text.contains("[api]"));
        assert!(text.contains("[channel.reconnect]"));
    }
}
