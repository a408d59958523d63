//! Dispatch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for how the `Auditor` hands events to its sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchConfig {
    /// Abandon a delivery that takes longer than this (seconds)
    ///
    /// Timed-out deliveries are treated as failures and dead-lettered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_timeout_secs: Option<u64>,

    /// Log at DEBUG when an operation finishes without declaring both
    /// resource and action
    pub log_untriggered: bool,
}

impl DispatchConfig {
    pub fn delivery_timeout(&self) -> Option<Duration> {
        self.delivery_timeout_secs.map(Duration::from_secs)
    }
}
