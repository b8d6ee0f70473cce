//! Miner configuration
//!
//! Values come from (lowest to highest precedence) built-in defaults, a JSON
//! config file, and command-line flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::algorithm::{SearchOptions, MAX_DIFFICULTY};
use crate::report::ReportFormat;
use crate::signer::{DEFAULT_KEY_BITS, MIN_KEY_BITS};

/// Prefix mined when none is configured
pub const DEFAULT_PREFIX: &str = "果糖酱";

/// Difficulty used when none is configured
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Config file name inside the config directory
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Fixed part of the hashed content
    pub prefix: String,
    /// Leading hex zeros required
    pub difficulty: u32,
    /// Worker threads (default: number of CPU cores)
    pub threads: Option<usize>,
    /// Try only nonces below this value
    pub max_attempts: Option<u64>,
    /// Give up after this many seconds
    pub timeout_secs: Option<u64>,
    /// Sign the winning content
    pub sign: bool,
    /// RSA key size for signing
    pub key_bits: usize,
    /// Seconds between hashrate log lines
    pub progress_interval_secs: u64,
    pub format: ReportFormat,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            threads: None,
            max_attempts: None,
            timeout_secs: None,
            sign: false,
            key_bits: DEFAULT_KEY_BITS,
            progress_interval_secs: 2,
            format: ReportFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl MinerConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else the default config file if present,
    /// else built-in defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_or_default_from(explicit, &default_config_path())
    }

    /// Like [`MinerConfig::load_or_default`] with the fallback file at
    /// `default_path`
    pub fn load_or_default_from(
        explicit: Option<&Path>,
        default_path: &Path,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::Invalid(format!(
                "difficulty {} exceeds {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        if self.key_bits < MIN_KEY_BITS {
            return Err(ConfigError::Invalid(format!(
                "key_bits {} is below {}",
                self.key_bits, MIN_KEY_BITS
            )));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.progress_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "progress_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Search bounds described by this config
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_attempts: self.max_attempts,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("ppow").join(CONFIG_FILE),
        None => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(".ppow").join(CONFIG_FILE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = MinerConfig::default();
        config.validate().unwrap();

        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.key_bits, 2048);
        assert_eq!(config.search_options(), SearchOptions::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = MinerConfig {
            prefix: "abc".to_string(),
            difficulty: 3,
            threads: Some(2),
            max_attempts: Some(10_000),
            timeout_secs: Some(30),
            sign: true,
            format: ReportFormat::Json,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = MinerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let options = loaded.search_options();
        assert_eq!(options.max_attempts, Some(10_000));
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "prefix": "hello", "format": "json" }"#).unwrap();

        let config = MinerConfig::load(&path).unwrap();
        assert_eq!(config.prefix, "hello");
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert!(!config.sign);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let err = MinerConfig::load_or_default(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_fallback_to_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let default_path = dir.path().join("ppow").join("config.json");

        let config = MinerConfig::load_or_default_from(None, &default_path).unwrap();
        assert_eq!(config, MinerConfig::default());
    }

    #[test]
    fn test_fallback_reads_default_file() {
        let dir = TempDir::new().unwrap();
        let default_path = dir.path().join("ppow").join("config.json");
        MinerConfig {
            prefix: "from-default".to_string(),
            sign: true,
            ..Default::default()
        }
        .save(&default_path)
        .unwrap();

        let config = MinerConfig::load_or_default_from(None, &default_path).unwrap();
        assert_eq!(config.prefix, "from-default");
        assert!(config.sign);
    }

    #[test]
    fn test_explicit_file_wins_over_default() {
        let dir = TempDir::new().unwrap();
        let default_path = dir.path().join("default.json");
        let explicit = dir.path().join("explicit.json");
        fs::write(&default_path, r#"{ "prefix": "default" }"#).unwrap();
        fs::write(&explicit, r#"{ "prefix": "explicit" }"#).unwrap();

        let config = MinerConfig::load_or_default_from(Some(&explicit), &default_path).unwrap();
        assert_eq!(config.prefix, "explicit");
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            MinerConfig::load(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        for body in [
            r#"{ "difficulty": 65 }"#,
            r#"{ "key_bits": 1024 }"#,
            r#"{ "threads": 0 }"#,
            r#"{ "progress_interval_secs": 0 }"#,
        ] {
            fs::write(&path, body).unwrap();
            assert!(
                matches!(MinerConfig::load(&path).unwrap_err(), ConfigError::Invalid(_)),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("config.json"));
    }
}
