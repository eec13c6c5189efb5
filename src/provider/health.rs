//! Point-in-time provider health verdicts
//!
//! Health is derived on demand from an availability probe and never
//! persisted. It answers "can this provider take a request right now",
//! which is distinct from the rolling `success_rate` that reflects
//! historical reliability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Availability verdict for one provider at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// True iff the availability probe succeeded just now
    pub is_healthy: bool,
    /// When the probe ran
    pub last_check: DateTime<Utc>,
    /// Human-readable probe outcome
    pub message: String,
}

impl HealthStatus {
    /// Build a healthy verdict stamped with the current time
    #[must_use]
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            is_healthy: true,
            last_check: Utc::now(),
            message: message.into(),
        }
    }

    /// Build an unhealthy verdict stamped with the current time
    #[must_use]
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            last_check: Utc::now(),
            message: message.into(),
        }
    }
}
