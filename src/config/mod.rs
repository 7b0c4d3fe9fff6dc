//! Configuration loading, validation, and runtime updates.

mod manager;
mod settings;

pub use manager::ConfigManager;
pub use settings::{
    CacheConfig, ConfidenceConfig, EventConfig, FeatureToggles, NetworkConfig, RecoveryConfig,
    RetryConfig, StorageConfig,
};
