//! Configuration settings for the kalends recovery engine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub retry: RetryConfig,
    pub confidence: ConfidenceConfig,
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub features: FeatureToggles,
    pub event: EventConfig,
    pub storage: StorageConfig,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            confidence: ConfidenceConfig::default(),
            cache: CacheConfig::default(),
            network: NetworkConfig::default(),
            features: FeatureToggles::default(),
            event: EventConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RecoveryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RecoveryConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("config.toml"),
            PathBuf::from("kalends.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("kalends/config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".kalends/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(RecoveryConfig::default())
    }

    /// Validate every tunable against its documented range.
    pub fn validate(&self) -> Result<()> {
        range_check(
            "retry.max_attempts",
            self.retry.max_attempts as f64,
            0.0,
            10.0,
        )?;
        range_check(
            "retry.base_delay_ms",
            self.retry.base_delay_ms as f64,
            100.0,
            10_000.0,
        )?;
        range_check(
            "retry.max_delay_ms",
            self.retry.max_delay_ms as f64,
            self.retry.base_delay_ms as f64,
            60_000.0,
        )?;
        range_check(
            "retry.backoff_multiplier",
            self.retry.backoff_multiplier,
            1.0,
            5.0,
        )?;
        range_check(
            "confidence.threshold",
            self.confidence.threshold as f64,
            0.0,
            1.0,
        )?;
        range_check("cache.size", self.cache.size as f64, 1.0, 1000.0)?;
        if self.cache.expiry_hours == 0 {
            return Err(ConfigError::Invalid(
                "cache.expiry_hours must be > 0".to_string(),
            )
            .into());
        }
        range_check(
            "network.timeout_ms",
            self.network.timeout_ms as f64,
            1000.0,
            30_000.0,
        )?;
        if self.event.default_duration_minutes == 0 {
            return Err(ConfigError::Invalid(
                "event.default_duration_minutes must be > 0".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Expand the data directory path.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(&self.storage.data_dir);
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

fn range_check(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Retry and backoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial one (0-10).
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds (100-10000).
    pub base_delay_ms: u64,
    /// Ceiling on any single backoff delay, in milliseconds (<= 60000).
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier (1.0-5.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Confidence gating configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Parses below this overall confidence are treated as failures (0-1).
    pub threshold: f32,
    /// Block creation when critical fields are missing.
    pub strict_mode: bool,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            strict_mode: false,
        }
    }
}

/// Request cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached requests before FIFO eviction (1-1000).
    pub size: usize,
    /// Cached requests older than this are dropped on read.
    pub expiry_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: 50,
            expiry_hours: 24,
        }
    }
}

/// Network call configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-attempt deadline for the remote parse, in milliseconds
    /// (1000-30000).
    pub timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Feature toggles for recovery behaviors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Synthesize events locally when the network is gone.
    pub offline_mode: bool,
    /// Allow heuristic fallback event creation.
    pub fallback_creation: bool,
    /// Allow asking the user to confirm uncertain events.
    pub user_confirmation: bool,
    /// Degrade to a best-effort event on validation failures.
    pub graceful_degradation: bool,
    /// Record anonymized outcome statistics.
    pub analytics: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            offline_mode: true,
            fallback_creation: true,
            user_confirmation: true,
            graceful_degradation: true,
            analytics: true,
        }
    }
}

/// Event synthesis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Duration used when no end time can be derived.
    pub default_duration_minutes: u32,
    /// Locale recorded with cached requests.
    pub locale: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
            locale: "en-US".to_string(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the request cache and outcome log.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.kalends".to_string(),
        }
    }
}
