//! Configuration management for floodgate.

use serde::{Deserialize, Serialize};

use crate::error::{FloodgateError, Result};
use crate::ratelimit::LimiterSettings;

/// Main configuration: one profile per guarded flow plus the sweep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Sign-in and sign-up attempts
    #[serde(default = "default_auth_profile")]
    pub auth: LimiterProfile,

    /// Order submissions
    #[serde(default = "default_order_profile")]
    pub order: LimiterProfile,

    /// Contact form submissions
    #[serde(default = "default_contact_profile")]
    pub contact: LimiterProfile,

    /// Milliseconds between background sweeps of expired entries
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for FloodgateConfig {
    fn default() -> Self {
        Self {
            auth: default_auth_profile(),
            order: default_order_profile(),
            contact: default_contact_profile(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

/// Quota and window for one limiter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterProfile {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Namespace for this instance's state keys
    pub key_prefix: String,
}

impl LimiterProfile {
    /// Convert this profile into limiter settings.
    pub fn settings(&self) -> LimiterSettings {
        LimiterSettings::new(self.max_requests, self.window_ms, self.key_prefix.clone())
    }
}

fn default_auth_profile() -> LimiterProfile {
    // 5 attempts per 15 minutes
    LimiterProfile {
        max_requests: 5,
        window_ms: 15 * 60 * 1000,
        key_prefix: "auth".to_string(),
    }
}

fn default_order_profile() -> LimiterProfile {
    // 10 orders per hour
    LimiterProfile {
        max_requests: 10,
        window_ms: 60 * 60 * 1000,
        key_prefix: "order".to_string(),
    }
}

fn default_contact_profile() -> LimiterProfile {
    // 3 contacts per hour
    LimiterProfile {
        max_requests: 3,
        window_ms: 60 * 60 * 1000,
        key_prefix: "contact".to_string(),
    }
}

fn default_sweep_interval_ms() -> u64 {
    5 * 60 * 1000
}

impl FloodgateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FloodgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every quota and interval is usable.
    pub fn validate(&self) -> Result<()> {
        for profile in [&self.auth, &self.order, &self.contact] {
            if profile.max_requests == 0 {
                return Err(FloodgateError::Config(format!(
                    "max_requests must be positive for '{}'",
                    profile.key_prefix
                )));
            }
            if profile.window_ms == 0 {
                return Err(FloodgateError::Config(format!(
                    "window_ms must be positive for '{}'",
                    profile.key_prefix
                )));
            }
        }
        if self.sweep_interval_ms == 0 {
            return Err(FloodgateError::Config(
                "sweep_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_quotas() {
        let config = FloodgateConfig::default();

        assert_eq!(config.auth.max_requests, 5);
        assert_eq!(config.auth.window_ms, 900_000);
        assert_eq!(config.auth.key_prefix, "auth");

        assert_eq!(config.order.max_requests, 10);
        assert_eq!(config.order.window_ms, 3_600_000);
        assert_eq!(config.order.key_prefix, "order");

        assert_eq!(config.contact.max_requests, 3);
        assert_eq!(config.contact.window_ms, 3_600_000);
        assert_eq!(config.contact.key_prefix, "contact");

        assert_eq!(config.sweep_interval_ms, 300_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let yaml = r#"
auth:
  max_requests: 3
  window_ms: 60000
  key_prefix: auth
"#;
        let config = FloodgateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.auth.max_requests, 3);
        assert_eq!(config.auth.window_ms, 60_000);
        // Untouched sections fall back to defaults.
        assert_eq!(config.order.max_requests, 10);
        assert_eq!(config.sweep_interval_ms, 300_000);
    }

    #[test]
    fn test_zero_quota_rejected() {
        let yaml = r#"
order:
  max_requests: 0
  window_ms: 3600000
  key_prefix: order
"#;
        let err = FloodgateConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("max_requests"));
    }

    #[test]
    fn test_zero_window_rejected() {
        let yaml = r#"
contact:
  max_requests: 3
  window_ms: 0
  key_prefix: contact
"#;
        let err = FloodgateConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("window_ms"));
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let result = FloodgateConfig::from_yaml("auth: [not, a, profile]");
        assert!(matches!(result, Err(FloodgateError::Config(_))));
    }
}
