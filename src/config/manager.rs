//! Runtime configuration updates with observer notification.
//!
//! Components hold an immutable `RecoveryConfig` snapshot or a watch
//! receiver; nothing reads mutable global state. Dropping the manager
//! closes the channel, which is the teardown signal for subscribers.

use tokio::sync::watch;

use crate::error::Result;

use super::settings::RecoveryConfig;

/// Owns the current configuration and notifies subscribers of changes.
pub struct ConfigManager {
    sender: watch::Sender<RecoveryConfig>,
}

impl ConfigManager {
    /// Create a manager around a validated configuration.
    pub fn new(config: RecoveryConfig) -> Result<Self> {
        config.validate()?;
        let (sender, _) = watch::channel(config);
        Ok(Self { sender })
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> RecoveryConfig {
        self.sender.borrow().clone()
    }

    /// Subscribe to configuration changes.
    pub fn subscribe(&self) -> watch::Receiver<RecoveryConfig> {
        self.sender.subscribe()
    }

    /// Validate and publish a new configuration.
    pub fn update(&self, config: RecoveryConfig) -> Result<()> {
        config.validate()?;
        self.sender.send_replace(config);
        Ok(())
    }
}
