//! Configuration management for the abuse guard.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{GuardError, Result};

/// Prefix for environment variable overrides, e.g. `ABUSE_GUARD__LIMITER__MAX`.
pub const ENV_PREFIX: &str = "ABUSE_GUARD";

/// Main configuration for the abuse guard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Admission counter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Chat moderation configuration
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Admission counter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Highest load an address may carry before it counts as limited
    #[serde(default = "default_max")]
    pub max: u64,

    /// Interval in milliseconds at which the whole table is cleared
    #[serde(default)]
    pub reset_interval_ms: Option<u64>,
}

impl LimiterConfig {
    /// Create a limiter configuration without a reset interval.
    pub fn new(max: u64) -> Self {
        Self {
            max,
            reset_interval_ms: None,
        }
    }

    /// Set the periodic reset interval.
    ///
    /// Non-zero intervals shorter than a millisecond round up to one.
    pub fn with_reset_interval(mut self, interval: Duration) -> Self {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.reset_interval_ms = Some(if millis == 0 && !interval.is_zero() {
            1
        } else {
            millis
        });
        self
    }

    /// The reset interval, if one is configured and non-zero.
    pub fn reset_interval(&self) -> Option<Duration> {
        self.reset_interval_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(default_max())
    }
}

fn default_max() -> u64 {
    5
}

/// What to do with a chat message that contains a disallowed word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePolicy {
    /// Drop the message
    #[default]
    Block,
    /// Mask the offending characters and let the message through
    Censor,
}

/// Chat moderation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Action taken on flagged messages
    #[serde(default)]
    pub policy: MessagePolicy,

    /// Include the built-in English word list
    #[serde(default = "default_use_builtin")]
    pub use_builtin: bool,

    /// Extra disallowed tokens
    #[serde(default)]
    pub words: Vec<String>,

    /// Path to a word list file (JSON, YAML or plain text)
    #[serde(default)]
    pub words_path: Option<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            policy: MessagePolicy::default(),
            use_builtin: default_use_builtin(),
            words: Vec::new(),
            words_path: None,
        }
    }
}

fn default_use_builtin() -> bool {
    true
}

impl GuardConfig {
    /// Load configuration from a YAML file, layered with environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading guard configuration");

        let path_str = path
            .to_str()
            .ok_or_else(|| GuardError::Config(format!("Non UTF-8 path: {}", path.display())))?;

        let settings = ::config::Config::builder()
            .add_source(::config::File::new(path_str, ::config::FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let config: GuardConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults and environment overrides only.
    pub fn from_env() -> Result<Self> {
        let settings = ::config::Config::builder().add_source(environment()).build()?;
        let config: GuardConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GuardConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::Config(format!("Failed to parse guard config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a file or environment cannot express as types.
    pub fn validate(&self) -> Result<()> {
        if self.limiter.max == 0 {
            return Err(GuardError::Config(
                "limiter.max must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.limiter.max, 5);
        assert_eq!(config.limiter.reset_interval(), None);
        assert_eq!(config.filter.policy, MessagePolicy::Block);
        assert!(config.filter.use_builtin);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
limiter:
  max: 3
  reset_interval_ms: 30000
filter:
  policy: censor
  use_builtin: false
  words:
    - badword
"#;
        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.max, 3);
        assert_eq!(config.limiter.reset_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.filter.policy, MessagePolicy::Censor);
        assert!(!config.filter.use_builtin);
        assert_eq!(config.filter.words, vec!["badword".to_string()]);
    }

    #[test]
    fn test_from_yaml_partial_uses_defaults() {
        let config = GuardConfig::from_yaml("limiter:\n  max: 9\n").unwrap();
        assert_eq!(config.limiter.max, 9);
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn test_zero_max_rejected() {
        let err = GuardConfig::from_yaml("limiter:\n  max: 0\n").unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[test]
    fn test_zero_interval_is_unset() {
        let config = LimiterConfig {
            max: 1,
            reset_interval_ms: Some(0),
        };
        assert_eq!(config.reset_interval(), None);
    }

    #[test]
    fn test_sub_second_interval_is_kept() {
        let config = LimiterConfig::new(1).with_reset_interval(Duration::from_millis(500));
        assert_eq!(config.reset_interval(), Some(Duration::from_millis(500)));

        let config = LimiterConfig::new(1).with_reset_interval(Duration::from_millis(1500));
        assert_eq!(config.reset_interval(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_sub_millisecond_interval_rounds_up() {
        let config = LimiterConfig::new(1).with_reset_interval(Duration::from_micros(200));
        assert_eq!(config.reset_interval(), Some(Duration::from_millis(1)));

        let config = LimiterConfig::new(1).with_reset_interval(Duration::ZERO);
        assert_eq!(config.reset_interval(), None);
    }

    #[test]
    fn test_environment_overrides() {
        // Keys chosen so no other test in this module asserts on them.
        std::env::set_var("ABUSE_GUARD__LIMITER__RESET_INTERVAL_MS", "250");
        std::env::set_var("ABUSE_GUARD__FILTER__POLICY", "censor");

        let result = GuardConfig::from_env();

        std::env::remove_var("ABUSE_GUARD__LIMITER__RESET_INTERVAL_MS");
        std::env::remove_var("ABUSE_GUARD__FILTER__POLICY");

        let config = result.unwrap();
        assert_eq!(config.limiter.reset_interval(), Some(Duration::from_millis(250)));
        assert_eq!(config.filter.policy, MessagePolicy::Censor);
        assert_eq!(config.limiter.max, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "limiter:\n  max: 12").unwrap();

        let config = GuardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.limiter.max, 12);
    }

    #[test]
    fn test_from_missing_file() {
        assert!(GuardConfig::from_file("/nonexistent/guard.yaml").is_err());
    }
}
