//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing so that a bad API base or an empty
//! user agent fails at load time instead of on the first request.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Contents of the forksync config file.
///
/// # Example
///
/// ```toml
/// api_base = "https://github.example.com/api/v3"
/// user_agent = "forksync"
///
/// [sync]
/// force = false
///
/// [pull_request]
/// draft = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// REST API base URL (GitHub Enterprise installations differ)
    pub api_base: Option<String>,

    /// User-Agent sent with every request
    pub user_agent: Option<String>,

    /// Branch synchronization defaults
    pub sync: Option<SyncDefaults>,

    /// Pull request defaults
    pub pull_request: Option<PullRequestDefaults>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(api_base) = &self.api_base {
            if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base '{}' must be an http(s) URL",
                    api_base
                )));
            }
        }

        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "user_agent cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Branch synchronization defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncDefaults {
    /// Force-update diverged fork branches instead of failing
    pub force: Option<bool>,
}

/// Pull request defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PullRequestDefaults {
    /// Open pull requests as drafts
    pub draft: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FileConfig::default();
        assert!(config.api_base.is_none());
        assert!(config.sync.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enterprise_api_base_accepted() {
        let config = FileConfig {
            api_base: Some("https://github.example.com/api/v3".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_http_api_base_rejected() {
        let config = FileConfig {
            api_base: Some("github.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_user_agent_rejected() {
        let config = FileConfig {
            user_agent: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = FileConfig {
            api_base: Some("https://api.github.com".to_string()),
            user_agent: Some("forksync-test".to_string()),
            sync: Some(SyncDefaults { force: Some(true) }),
            pull_request: Some(PullRequestDefaults { draft: Some(false) }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
            api_base = "https://api.github.com"
            token = "ghp_nope"
        "#;

        let result: Result<FileConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
