//! Stack configuration.
//!
//! Which families exist at all is decided at build time by Cargo features
//! (`inet`, `local`, `usrsock`). This configuration decides which of the
//! compiled-in families are registered, and how.
//!
//! # Example
//!
//! ```ignore
//! use sockif::socket::StackConfig;
//!
//! let config = StackConfig::from_json_str(r#"{
//!     "inet": { "ipv6": true, "max_conns": 16 },
//!     "local": { "enabled": false },
//!     "usrsock": {
//!         "enabled": true,
//!         "timeout_ms": 500,
//!         "policy": { "default": "defer", "families": { "inet": "accept" } }
//!     }
//! }"#)?;
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Top-level stack configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Native AF_INET/AF_INET6 backend.
    pub inet: InetConfig,
    /// Native AF_LOCAL backend.
    pub local: LocalConfig,
    /// User-space socket proxy.
    pub usrsock: UsrsockConfig,
}

impl StackConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.inet.max_conns == Some(0) {
            return Err(Error::InvalidConfig("inet.max_conns must be positive".into()));
        }
        if self.local.max_conns == Some(0) {
            return Err(Error::InvalidConfig("local.max_conns must be positive".into()));
        }
        if self.usrsock.enabled && self.usrsock.timeout_ms == 0 {
            return Err(Error::InvalidConfig("usrsock.timeout_ms must be positive".into()));
        }
        if self.inet.ipv6 && !self.inet.enabled {
            return Err(Error::InvalidConfig("inet.ipv6 requires inet.enabled".into()));
        }
        Ok(())
    }
}

/// Native inet backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InetConfig {
    /// Register AF_INET.
    pub enabled: bool,
    /// Also register AF_INET6.
    pub ipv6: bool,
    /// Allow SOCK_RAW endpoints.
    pub allow_raw: bool,
    /// Maximum concurrent connections (unlimited when absent).
    pub max_conns: Option<usize>,
}

impl Default for InetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ipv6: false,
            allow_raw: false,
            max_conns: None,
        }
    }
}

/// Native local backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Register AF_LOCAL.
    pub enabled: bool,
    /// Maximum concurrent connections (unlimited when absent).
    pub max_conns: Option<usize>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_conns: None,
        }
    }
}

/// User-space socket proxy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsrsockConfig {
    /// Route creation requests through the daemon first.
    pub enabled: bool,
    /// Per-request timeout for daemon round trips.
    pub timeout_ms: u64,
    /// How the bundled policy daemon answers requests.
    pub policy: PolicyConfig,
}

impl Default for UsrsockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 1000,
            policy: PolicyConfig::default(),
        }
    }
}

/// Answer policy for the bundled usrsock daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Answer for families without an override.
    pub default: PolicyAction,
    /// Per-family overrides, keyed by family name or number.
    pub families: BTreeMap<String, PolicyAction>,
}

/// How the policy daemon answers a socket request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Create the socket in the daemon.
    Accept,
    /// Hand the request back to the kernel (`ENOSYS`).
    #[default]
    Defer,
    /// Decline the family (`EOPNOTSUPP`).
    Decline,
    /// Behave as if the daemon were gone (`ENETDOWN`).
    Down,
    /// Fail with the given errno.
    Errno(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StackConfig::default();
        assert!(config.inet.enabled);
        assert!(!config.inet.ipv6);
        assert!(config.local.enabled);
        assert!(!config.usrsock.enabled);
        assert_eq!(config.usrsock.policy.default, PolicyAction::Defer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = StackConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StackConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = StackConfig::from_json_str(
            r#"{
                "inet": { "ipv6": true, "allow_raw": true, "max_conns": 4 },
                "local": { "enabled": false },
                "usrsock": {
                    "enabled": true,
                    "timeout_ms": 250,
                    "policy": {
                        "default": "decline",
                        "families": { "inet": "accept", "local": { "errno": 12 } }
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(config.inet.ipv6);
        assert!(config.inet.allow_raw);
        assert_eq!(config.inet.max_conns, Some(4));
        assert!(!config.local.enabled);
        assert!(config.usrsock.enabled);
        assert_eq!(config.usrsock.timeout_ms, 250);
        assert_eq!(config.usrsock.policy.default, PolicyAction::Decline);
        assert_eq!(
            config.usrsock.policy.families.get("inet"),
            Some(&PolicyAction::Accept)
        );
        assert_eq!(
            config.usrsock.policy.families.get("local"),
            Some(&PolicyAction::Errno(12))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = StackConfig::from_json_str(r#"{ "inet": { "mtu": 1500 } }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_validate() {
        let err = StackConfig::from_json_str(r#"{ "inet": { "max_conns": 0 } }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = StackConfig::from_json_str(r#"{ "inet": { "enabled": false, "ipv6": true } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("inet.ipv6"));

        let err = StackConfig::from_json_str(r#"{ "usrsock": { "enabled": true, "timeout_ms": 0 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_from_path_missing() {
        let err = StackConfig::from_path("/nonexistent/sockif.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
