//! Storefront configuration
//!
//! Sources are layered with increasing precedence: built-in defaults, an
//! optional JSON or YAML file, then `STOREFRONT_*` environment variables.
//! Command line flags are applied on top by the binary.

use crate::cache::{CacheConfig, EvictionPolicyKind};
use crate::error::{Result, StorefrontError};
use crate::tasks::TaskConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_file: None,
        }
    }
}

/// Complete storefront configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub cache: CacheConfig,
    pub tasks: TaskConfig,
    pub logging: LoggingConfig,
}

impl StorefrontConfig {
    /// Load a configuration file, JSON unless the extension is `yaml`/`yml`.
    /// Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorefrontError::configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| {
                StorefrontError::configuration(format!("Failed to parse YAML config: {e}"))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                StorefrontError::configuration(format!("Failed to parse JSON config: {e}"))
            })
        }
    }

    /// Save the configuration, YAML for `yaml`/`yml` extensions and JSON
    /// otherwise
    ///
    /// # Errors
    /// Returns an error if the file cannot be serialized or written
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| {
                StorefrontError::configuration(format!("Failed to serialize YAML: {e}"))
            })?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override fields from `STOREFRONT_*` environment variables
    ///
    /// # Errors
    /// Returns an error if a numeric or enum variable cannot be parsed
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(policy) = env_var("STOREFRONT_CACHE_POLICY") {
            self.cache.policy = policy
                .parse::<EvictionPolicyKind>()
                .map_err(StorefrontError::configuration)?;
        }
        if let Some(value) = env_var("STOREFRONT_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_number("STOREFRONT_CACHE_MAX_ENTRIES", &value)?;
        }
        if let Some(value) = env_var("STOREFRONT_CACHE_MAX_BYTES") {
            self.cache.max_bytes = parse_number("STOREFRONT_CACHE_MAX_BYTES", &value)?;
        }
        if let Some(value) = env_var("STOREFRONT_CACHE_ORDER_WEIGHT_BYTES") {
            self.cache.order_weight_bytes =
                parse_number("STOREFRONT_CACHE_ORDER_WEIGHT_BYTES", &value)?;
        }
        if let Some(value) = env_var("STOREFRONT_CACHE_SWEEP_ENABLED") {
            self.cache.sweep_enabled = parse_bool(&value);
        }
        if let Some(value) = env_var("STOREFRONT_CACHE_SWEEP_INTERVAL_SECS") {
            self.cache.sweep_interval_secs =
                parse_number("STOREFRONT_CACHE_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = env_var("STOREFRONT_SOURCE_LOG") {
            self.tasks.source_log = PathBuf::from(value);
        }
        if let Some(value) = env_var("STOREFRONT_OUTPUT_DIR") {
            self.tasks.output_dir = PathBuf::from(value);
        }
        if let Some(value) = env_var("STOREFRONT_INITIAL_DELAY_MS") {
            self.tasks.initial_delay_ms = parse_number("STOREFRONT_INITIAL_DELAY_MS", &value)?;
        }
        if let Some(value) = env_var("STOREFRONT_TASK_WORKERS") {
            self.tasks.workers = parse_number("STOREFRONT_TASK_WORKERS", &value)?;
        }

        if let Some(value) = env_var("STOREFRONT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = env_var("STOREFRONT_JSON_LOGS") {
            self.logging.json = parse_bool(&value);
        }
        if let Some(value) = env_var("STOREFRONT_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Check the configuration for values no component can run with
    ///
    /// # Errors
    /// Returns a configuration error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        match self.cache.policy {
            EvictionPolicyKind::Lru if self.cache.max_entries == 0 => {
                return Err(StorefrontError::configuration(
                    "cache.max_entries must be greater than 0",
                ));
            }
            EvictionPolicyKind::Size if self.cache.max_bytes == 0 => {
                return Err(StorefrontError::configuration(
                    "cache.max_bytes must be greater than 0",
                ));
            }
            _ => {}
        }
        if self.cache.order_weight_bytes == 0 {
            return Err(StorefrontError::configuration(
                "cache.order_weight_bytes must be greater than 0",
            ));
        }
        if self.cache.sweep_enabled && self.cache.sweep_interval_secs == 0 {
            return Err(StorefrontError::configuration(
                "cache.sweep_interval_secs must be greater than 0 when sweeping is enabled",
            ));
        }
        if self.tasks.workers == 0 {
            return Err(StorefrontError::configuration(
                "tasks.workers must be greater than 0",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(StorefrontError::configuration(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Layered configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: StorefrontConfig,
    config_file: Option<PathBuf>,
    load_from_env: bool,
    validate: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: StorefrontConfig::default(),
            config_file: None,
            load_from_env: true,
            validate: true,
        }
    }

    #[must_use]
    pub fn with_base_config(mut self, config: StorefrontConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Read this file on top of the base configuration. Unlike the
    /// environment layer, a named file that is missing is an error.
    #[must_use]
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Load configuration from all sources
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or the result is invalid
    pub fn load(&self) -> Result<StorefrontConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                debug!("Loading configuration from file: {}", path.display());
                let config = StorefrontConfig::from_file(path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => self.base_config.clone(),
        };

        if self.load_from_env {
            config.apply_env()?;
        }
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml" | "yml")
    )
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StorefrontError::configuration(format!("Invalid {name} value: {value}")))
}

fn parse_bool(value: &str) -> bool {
    let lower = value.to_lowercase();
    matches!(lower.as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = StorefrontConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.policy, EvictionPolicyKind::Lru);
        assert_eq!(config.cache.sweep_interval_secs, 1800);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = StorefrontConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        // Entry bound is ignored under the size policy.
        config.cache.policy = EvictionPolicyKind::Size;
        assert!(config.validate().is_ok());
        config.cache.max_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = StorefrontConfig::default();
        config.tasks.workers = 0;
        assert!(config.validate().is_err());

        let mut config = StorefrontConfig::default();
        config.cache.sweep_interval_secs = 0;
        assert!(config.validate().is_err());
        config.cache.sweep_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let mut config = StorefrontConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let mut config = StorefrontConfig::default();
        config.cache.policy = EvictionPolicyKind::Size;
        config.tasks.workers = 3;

        for name in ["config.json", "config.yaml"] {
            let path = dir.path().join(name);
            config.to_file(&path).unwrap();
            assert_eq!(StorefrontConfig::from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "cache:\n  max_entries: 5\n").unwrap();

        let config = StorefrontConfig::from_file(&path).unwrap();
        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.tasks, TaskConfig::default());
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            StorefrontConfig::from_file(&path),
            Err(StorefrontError::Configuration { .. })
        ));
        assert!(StorefrontConfig::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tasks": {"workers": 2, "initial_delay_ms": 10}}"#).unwrap();

        std::env::set_var("STOREFRONT_TASK_WORKERS", "6");
        std::env::set_var("STOREFRONT_CACHE_POLICY", "size");
        std::env::set_var("STOREFRONT_JSON_LOGS", "yes");

        let config = ConfigLoader::new().with_config_file(&path).load().unwrap();

        std::env::remove_var("STOREFRONT_TASK_WORKERS");
        std::env::remove_var("STOREFRONT_CACHE_POLICY");
        std::env::remove_var("STOREFRONT_JSON_LOGS");

        assert_eq!(config.tasks.workers, 6);
        assert_eq!(config.tasks.initial_delay_ms, 10);
        assert_eq!(config.cache.policy, EvictionPolicyKind::Size);
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_env_invalid_number() {
        std::env::set_var("STOREFRONT_CACHE_MAX_ENTRIES", "many");
        let result = ConfigLoader::new().load();
        std::env::remove_var("STOREFRONT_CACHE_MAX_ENTRIES");

        assert!(matches!(result, Err(StorefrontError::Configuration { .. })));
    }

    #[test]
    #[serial]
    fn test_loader_without_env() {
        std::env::set_var("STOREFRONT_TASK_WORKERS", "6");
        let mut base = StorefrontConfig::default();
        base.tasks.workers = 1;

        let config = ConfigLoader::new()
            .with_base_config(base)
            .with_env_loading(false)
            .load()
            .unwrap();
        std::env::remove_var("STOREFRONT_TASK_WORKERS");

        assert_eq!(config.tasks.workers, 1);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("ON"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("whatever"));
    }
}
