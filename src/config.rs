use crate::error::{LockerError, Result};
use crate::locking::escalation::DEFAULT_ESCALATION_THRESHOLD;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables that override configuration values.
///
/// Nested keys use a double underscore, e.g. `ENTITY_LOCKER_ESCALATION__THRESHOLD=20`.
pub const ENV_PREFIX: &str = "ENTITY_LOCKER";
const DEFAULT_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerConfig {
    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_escalation_enabled")]
    pub enabled: bool,

    #[serde(default = "default_escalation_threshold")]
    pub threshold: u32,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationConfig::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_escalation_enabled() -> bool {
    true
}

fn default_escalation_threshold() -> u32 {
    DEFAULT_ESCALATION_THRESHOLD
}

impl LockerConfig {
    /// Loads defaults, then the optional TOML file, then `ENTITY_LOCKER_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`LockerConfig::load`], reading overrides from `env` instead of the process
    /// environment when it is provided.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(LockerError::InvalidConfig(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
            log::debug!("Reading locker configuration from {path:?}");
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: LockerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        log::debug!("Effective locker configuration: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(LockerError::InvalidConfig(
                "default_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_default_config() {
        let config = LockerConfig::default();
        assert!(config.escalation.enabled);
        assert_eq!(config.escalation.threshold, 12);
        assert_eq!(config.default_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_without_sources_uses_defaults() {
        let config = LockerConfig::load_with_env(None, no_env()).unwrap();
        assert_eq!(config, LockerConfig::default());
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let err = LockerConfig::load_with_env(Some(&path), no_env()).unwrap_err();
        assert!(matches!(err, LockerError::InvalidConfig(_)));
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locker.toml");
        fs::write(&path, "default_timeout_ms = 750\n").unwrap();

        let config = LockerConfig::load_with_env(Some(&path), no_env()).unwrap();
        assert_eq!(config.default_timeout_ms, 750);
        assert_eq!(config.escalation, EscalationConfig::default());
    }

    #[test]
    fn test_file_with_escalation_section() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locker.toml");
        fs::write(
            &path,
            r#"
[escalation]
enabled = false
threshold = 4
"#,
        )
        .unwrap();

        let config = LockerConfig::load_with_env(Some(&path), no_env()).unwrap();
        assert!(!config.escalation.enabled);
        assert_eq!(config.escalation.threshold, 4);
        assert_eq!(config.default_timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_environment_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locker.toml");
        fs::write(&path, "[escalation]\nthreshold = 4\n").unwrap();

        let env = HashMap::from([
            (
                "ENTITY_LOCKER_ESCALATION__THRESHOLD".to_string(),
                "20".to_string(),
            ),
            (
                "ENTITY_LOCKER_DEFAULT_TIMEOUT_MS".to_string(),
                "90".to_string(),
            ),
        ]);
        let config = LockerConfig::load_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(config.escalation.threshold, 20);
        assert_eq!(config.default_timeout_ms, 90);
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locker.toml");
        fs::write(&path, "default_timeout_ms = 0\n").unwrap();

        let err = LockerConfig::load_with_env(Some(&path), no_env()).unwrap_err();
        assert!(err.to_string().contains("default_timeout_ms"));
    }

    #[test]
    fn test_renders_as_toml() {
        let rendered = LockerConfig::default().to_toml().unwrap();
        assert!(rendered.contains("default_timeout_ms = 500"));
        assert!(rendered.contains("[escalation]"));
        assert!(rendered.contains("threshold = 12"));
    }
}
