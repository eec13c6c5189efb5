//! Per-call scrape options
//!
//! Every field is optional; unset fields take the orchestrator's configured
//! defaults when the request is resolved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::orchestrator::strategy::SelectionStrategy;
use crate::provider::RequiredCapabilities;

/// Caller-supplied options for one scrape call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Per-attempt timeout override
    pub timeout: Option<Duration>,
    /// Retry budget override (attempts per provider = `max_retries + 1`)
    pub max_retries: Option<u32>,
    /// Ranking strategy override for this call
    pub strategy: Option<SelectionStrategy>,
    /// Cost budget override for this call
    pub max_cost_per_request: Option<f64>,
    /// Capabilities the caller demands of any provider used
    pub required_capabilities: RequiredCapabilities,
    /// User agent override
    pub user_agent: Option<String>,
    /// Extra request headers
    pub headers: HashMap<String, String>,
    /// Deadline for the whole fallback loop, including all retries
    pub overall_deadline: Option<Duration>,
}

impl ScrapeOptions {
    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the retry budget per provider
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Override the ranking strategy for this call
    #[must_use]
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Override the cost budget for this call
    #[must_use]
    pub fn with_max_cost_per_request(mut self, budget: f64) -> Self {
        self.max_cost_per_request = Some(budget);
        self
    }

    /// Demand capabilities of any provider used for this call
    #[must_use]
    pub fn with_required_capabilities(mut self, required: RequiredCapabilities) -> Self {
        self.required_capabilities = required;
        self
    }

    /// Set the user agent sent with each attempt
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add one request header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Bound the whole fallback loop with a caller-level deadline
    #[must_use]
    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }
}
