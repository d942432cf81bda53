//! Reconciliation configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
const MAX_ITEM_DELAY_SECS: u64 = 60 * 60;
const MAX_DEDUP_WINDOW_MINUTES: u64 = 30 * 24 * 60;

/// Background reconciliation and webhook dedup settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Run the polling loop
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minutes between cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Seconds between two merchants in a cycle
    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,

    /// Minutes a webhook receipt suppresses redeliveries
    #[serde(default = "default_dedup_window_minutes")]
    pub webhook_dedup_window_minutes: u64,
}

impl ReconciliationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.webhook_dedup_window_minutes * 60)
    }

    /// Validate reconciliation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_minutes == 0 || self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(ValidationError::InvalidReconciliationInterval);
        }
        if self.item_delay_secs > MAX_ITEM_DELAY_SECS {
            return Err(ValidationError::InvalidItemDelay);
        }
        if self.webhook_dedup_window_minutes == 0
            || self.webhook_dedup_window_minutes > MAX_DEDUP_WINDOW_MINUTES
        {
            return Err(ValidationError::InvalidDedupWindow);
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_minutes: default_interval_minutes(),
            item_delay_secs: default_item_delay_secs(),
            webhook_dedup_window_minutes: default_dedup_window_minutes(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_minutes() -> u64 {
    30
}

fn default_item_delay_secs() -> u64 {
    1
}

fn default_dedup_window_minutes() -> u64 {
    24 * 60
}
