//! Orchestrator-level configuration
//!
//! Defaults here apply to every scrape call; callers override per request
//! via `ScrapeOptions`. Every field has a sensible default, so the struct
//! builds fluently from `OrchestratorConfig::default()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::orchestrator::retry::BackoffPolicy;
use crate::orchestrator::strategy::SelectionStrategy;
use crate::utils::constants::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_CONTENT_LENGTH,
};

/// Configuration for a [`ProviderManager`](crate::orchestrator::ProviderManager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ranking strategy when the caller does not override it
    pub strategy: SelectionStrategy,
    /// Cost budget per request; providers above it are demoted to the end
    /// of the ranked list, never removed
    pub max_cost_per_request: Option<f64>,
    /// Allow-list of provider names; empty means every registered provider
    pub enabled_providers: Vec<String>,
    /// Per-attempt timeout when the caller does not override it
    pub default_timeout: Duration,
    /// Retry budget per provider when the caller does not override it
    pub default_max_retries: u32,
    /// Bodies shorter than this count as attempt failures
    pub min_content_length: usize,
    /// Delay schedule between attempts
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            max_cost_per_request: None,
            enabled_providers: Vec::new(),
            default_timeout: DEFAULT_FETCH_TIMEOUT,
            default_max_retries: DEFAULT_MAX_RETRIES,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the default ranking strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the per-request cost budget
    #[must_use]
    pub fn with_max_cost_per_request(mut self, budget: f64) -> Self {
        self.max_cost_per_request = Some(budget);
        self
    }

    /// Restrict scraping to the named providers
    #[must_use]
    pub fn with_enabled_providers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_providers = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default per-attempt timeout
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the default retry budget per provider
    #[must_use]
    pub fn with_default_max_retries(mut self, retries: u32) -> Self {
        self.default_max_retries = retries;
        self
    }

    /// Set the minimum acceptable body length
    #[must_use]
    pub fn with_min_content_length(mut self, bytes: usize) -> Self {
        self.min_content_length = bytes;
        self
    }

    /// Set the inter-attempt backoff schedule
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}
