//! Configuration file support.
//!
//! Loader settings are stored as versioned JSON so they can be shared between
//! machines and kept next to analysis scripts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What the loader does when a foreign file cannot become a datacube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Return a random placeholder datacube (interactive use)
    #[default]
    Lenient,
    /// Return the error (batch pipelines)
    Strict,
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Placeholder shape: a 100 × 512 × 512 stack as a 10 × 10 scan.
pub const DEFAULT_FALLBACK_SHAPE: [usize; 4] = [10, 10, 512, 512];

/// Largest placeholder a config file may request (1 GiB of `f32`).
pub const MAX_FALLBACK_ELEMENTS: usize = 1 << 28;

/// Fallback section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub policy: FallbackPolicy,

    /// Shape of the placeholder datacube `(R_Ny, R_Nx, Q_Ny, Q_Nx)`
    #[serde(default = "default_fallback_shape")]
    pub shape: [usize; 4],

    /// Seed for reproducible placeholders; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_fallback_shape() -> [usize; 4] {
    DEFAULT_FALLBACK_SHAPE
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::default(),
            shape: default_fallback_shape(),
            seed: None,
        }
    }
}

/// Loader configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl ReaderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            fallback: FallbackConfig::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Default configuration with the strict fallback policy.
    pub fn strict() -> Self {
        let mut config = Self::new();
        config.fallback.policy = FallbackPolicy::Strict;
        config
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        if config.fallback.shape.contains(&0) {
            return Err(ConfigError::Invalid(format!(
                "fallback shape {:?} has an empty axis",
                config.fallback.shape
            )));
        }
        let elements = config
            .fallback
            .shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .filter(|&n| n <= MAX_FALLBACK_ELEMENTS);
        if elements.is_none() {
            return Err(ConfigError::Invalid(format!(
                "fallback shape {:?} exceeds {} elements",
                config.fallback.shape, MAX_FALLBACK_ELEMENTS
            )));
        }

        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "stemcube-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("stemcube").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("stemcube")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
