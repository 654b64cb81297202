//! Framer configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via CASTFRAME_CONFIG or --config)
//! 3. Environment variables

use crate::frame::{DEFAULT_MAX_FRAME_SIZE, MAX_FRAME_SIZE_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default initial capacity of the framer's internal buffer (8 KiB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 8 * 1024;

/// Default capacity above which an emptied buffer is reallocated (256 KiB).
pub const DEFAULT_SHRINK_THRESHOLD: usize = 256 * 1024;

/// Per-connection framer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerConfig {
    /// Largest payload length a frame may declare.
    pub max_frame_size: u32,
    /// Capacity the internal buffer starts with.
    pub initial_capacity: usize,
    /// When the buffer drains empty with more capacity than this, the
    /// allocation is released and replaced with `initial_capacity`.
    pub shrink_threshold: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
        }
    }
}

impl FramerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame_size(mut self, max: u32) -> Self {
        self.max_frame_size = max;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_shrink_threshold(mut self, threshold: usize) -> Self {
        self.shrink_threshold = threshold;
        self
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load), but an explicit `path` takes precedence over
    /// `CASTFRAME_CONFIG`. Environment overrides apply either way.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => lookup("CASTFRAME_CONFIG").map(PathBuf::from),
        };

        let mut config = match file {
            Some(file) => Self::from_file(file)?,
            None => Self::default(),
        };

        config.apply_overrides_from(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: FramerConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup. Unparseable values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(max) = lookup("CASTFRAME_MAX_FRAME_SIZE") {
            if let Ok(n) = max.parse() {
                self.max_frame_size = n;
            }
        }

        if let Some(cap) = lookup("CASTFRAME_INITIAL_CAPACITY") {
            if let Ok(n) = cap.parse() {
                self.initial_capacity = n;
            }
        }

        if let Some(threshold) = lookup("CASTFRAME_SHRINK_THRESHOLD") {
            if let Ok(n) = threshold.parse() {
                self.shrink_threshold = n;
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_frame_size must be greater than 0".to_string(),
            ));
        }
        if self.max_frame_size > MAX_FRAME_SIZE_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_frame_size ({}) must not exceed {}",
                self.max_frame_size, MAX_FRAME_SIZE_LIMIT
            )));
        }
        if self.shrink_threshold < self.initial_capacity {
            return Err(ConfigError::ValidationError(format!(
                "shrink_threshold ({}) must not be below initial_capacity ({})",
                self.shrink_threshold, self.initial_capacity
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    IoError(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = FramerConfig::default();
        assert_eq!(config.max_frame_size, 1024 * 1024);
        assert_eq!(config.initial_capacity, 8 * 1024);
        assert_eq!(config.shrink_threshold, 256 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = FramerConfig::default().with_max_frame_size(4096);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: FramerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: FramerConfig = serde_yaml::from_str("max_frame_size: 65536\n").unwrap();
        assert_eq!(parsed.max_frame_size, 65536);
        assert_eq!(parsed.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(parsed.shrink_threshold, DEFAULT_SHRINK_THRESHOLD);
    }

    #[test]
    fn test_from_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castframe.yaml");

        let config = FramerConfig::default()
            .with_max_frame_size(2048)
            .with_initial_capacity(512)
            .with_shrink_threshold(1024);
        config.save(&path).unwrap();

        let loaded = FramerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_missing() {
        let result = FramerConfig::from_file("/nonexistent/castframe.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_, _))));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "max_frame_size: [not, a, number]\n").unwrap();

        let result = FramerConfig::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("CASTFRAME_MAX_FRAME_SIZE", "65536"),
            ("CASTFRAME_INITIAL_CAPACITY", "not-a-number"),
            ("CASTFRAME_SHRINK_THRESHOLD", "1048576"),
        ]
        .into_iter()
        .collect();

        let mut config = FramerConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.max_frame_size, 65536);
        // Unparseable value leaves the default in place
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(config.shrink_threshold, 1024 * 1024);
    }

    #[test]
    fn test_validate() {
        let config = FramerConfig::default().with_max_frame_size(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let config = FramerConfig::default()
            .with_initial_capacity(4096)
            .with_shrink_threshold(1024);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shrink_threshold"));
    }

    #[test]
    fn test_validate_frame_size_limit() {
        let config = FramerConfig::default().with_max_frame_size(MAX_FRAME_SIZE_LIMIT);
        assert!(config.validate().is_ok());

        let config = FramerConfig::default().with_max_frame_size(MAX_FRAME_SIZE_LIMIT + 1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_frame_size"));

        let config = FramerConfig::default().with_max_frame_size(u32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_with_explicit_path_applies_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let explicit = temp_dir.path().join("explicit.yaml");
        let from_env = temp_dir.path().join("from_env.yaml");
        std::fs::write(&explicit, "max_frame_size: 4096\n").unwrap();
        std::fs::write(&from_env, "max_frame_size: 8192\n").unwrap();

        let env: HashMap<&str, String> = [
            ("CASTFRAME_CONFIG", from_env.display().to_string()),
            ("CASTFRAME_INITIAL_CAPACITY", "2048".to_string()),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).cloned();

        let config = FramerConfig::load_with(Some(&explicit), lookup).unwrap();
        assert_eq!(config.max_frame_size, 4096);
        assert_eq!(config.initial_capacity, 2048);
        assert_eq!(config.shrink_threshold, DEFAULT_SHRINK_THRESHOLD);

        let config = FramerConfig::load_with(None, lookup).unwrap();
        assert_eq!(config.max_frame_size, 8192);
        assert_eq!(config.initial_capacity, 2048);
    }

    #[test]
    fn test_load_with_env_override_is_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("castframe.yaml");
        std::fs::write(&path, "initial_capacity: 1024\n").unwrap();

        let lookup = |key: &str| {
            (key == "CASTFRAME_SHRINK_THRESHOLD").then(|| "512".to_string())
        };
        let result = FramerConfig::load_with(Some(&path), lookup);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_with_defaults() {
        let config = FramerConfig::load_with(None, |_| None).unwrap();
        assert_eq!(config, FramerConfig::default());
    }
}
