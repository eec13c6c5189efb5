//! Capability descriptors for fetch providers
//!
//! Each provider declares an immutable capability descriptor at registration
//! time. The orchestrator uses descriptors for filtering and ranking only;
//! they are never mutated after construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable capability descriptor for a single fetch provider
///
/// Set once when the provider is constructed and never changed. The
/// `cost_per_request` and `response_time_hint` fields feed the ranking
/// strategies; the boolean flags feed capability filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Provider executes JavaScript before returning the document
    pub supports_javascript: bool,
    /// Provider evades anti-bot measures (fingerprint rotation, residential
    /// exit nodes, CAPTCHA solving)
    pub supports_anti_bot_evasion: bool,
    /// Requests against this provider are billed
    pub is_commercial: bool,
    /// Cost charged per successful request, in the operator's cost unit
    pub cost_per_request: f64,
    /// Maximum concurrent in-flight fetches this backend tolerates
    pub max_concurrency: usize,
    /// Expected response time before any requests have completed
    ///
    /// Used by the speed-optimized strategy as a stand-in until the rolling
    /// average has real samples.
    pub response_time_hint: Duration,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supports_javascript: false,
            supports_anti_bot_evasion: false,
            is_commercial: false,
            cost_per_request: 0.0,
            max_concurrency: 4,
            response_time_hint: Duration::from_secs(2),
        }
    }
}

/// Capability subset a caller demands for one request
///
/// A provider satisfies the requirement iff every flag demanded here is
/// present in its descriptor. An all-false value (the default) matches every
/// provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCapabilities {
    /// Caller needs JavaScript rendering
    pub javascript: bool,
    /// Caller needs anti-bot evasion
    pub anti_bot_evasion: bool,
}

impl RequiredCapabilities {
    /// Check whether a provider's descriptor satisfies this requirement
    #[must_use]
    pub fn satisfied_by(&self, capabilities: &ProviderCapabilities) -> bool {
        (!self.javascript || capabilities.supports_javascript)
            && (!self.anti_bot_evasion || capabilities.supports_anti_bot_evasion)
    }
}
