//! Provider registry and the ranked fallback loop
//!
//! `ProviderManager` is the top-level coordinator: it registers providers,
//! filters them per call, hands survivors to the ranking strategy, and walks
//! the ranked list with a bounded retry loop per provider until one succeeds
//! or all are exhausted. Scrape calls are independent; the manager holds no
//! call-scoped lock, and the only shared mutable state is each provider's
//! own atomic metrics.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::{AttemptRecord, ScrapeError};
use super::retry::{Sleeper, TokioSleeper, fetch_with_retries};
use crate::config::{OrchestratorConfig, ScrapeOptions};
use crate::provider::{FetchProvider, FetchRequest, HealthStatus, MetricsSnapshot, ScrapeResult};

/// Outcome of releasing provider-held resources
///
/// Cleanup keeps going past individual failures so one stuck browser does
/// not leave every other provider's resources dangling.
#[derive(Debug, Clone)]
pub enum CleanupReport {
    /// Every provider released its resources
    Success,
    /// Some providers failed to release, with error details
    PartialFailure(Vec<String>),
}

impl CleanupReport {
    /// True when every provider cleaned up
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Top-level coordinator for provider registration, ranking, and fallback
pub struct ProviderManager {
    providers: RwLock<Vec<Arc<dyn FetchProvider>>>,
    config: OrchestratorConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl ProviderManager {
    /// Create a manager with the given configuration
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a manager with an injected inter-attempt sleeper
    ///
    /// Tests use this to run the backoff schedule without wall-clock waits.
    #[must_use]
    pub fn with_sleeper(config: OrchestratorConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            config,
            sleeper,
        }
    }

    /// Register a provider
    ///
    /// Registration order is the tiebreaker for every ranking strategy. A
    /// provider re-registered under an existing name replaces the original
    /// in place, keeping its position in the order.
    pub async fn register(&self, provider: Arc<dyn FetchProvider>) {
        let mut providers = self.providers.write().await;
        if let Some(slot) = providers.iter_mut().find(|p| p.name() == provider.name()) {
            warn!("replacing already-registered provider '{}'", provider.name());
            *slot = provider;
        } else {
            info!(
                provider = provider.name(),
                cost = provider.capabilities().cost_per_request,
                "registered provider"
            );
            providers.push(provider);
        }
    }

    /// Fetch `url` through the best available provider, falling back across
    /// the ranked candidates until one succeeds
    ///
    /// # Errors
    /// - [`ScrapeError::InvalidUrl`] before any provider is touched
    /// - [`ScrapeError::NoSuitableProviders`] when filtering leaves nothing
    /// - [`ScrapeError::AllProvidersFailed`] when every candidate exhausts
    ///   its retries (or the overall deadline elapses)
    pub async fn scrape(
        &self,
        url: &str,
        options: ScrapeOptions,
    ) -> Result<ScrapeResult, ScrapeError> {
        let target = validate_url(url)?;
        let candidates = self.eligible_providers(&options).await?;
        let candidates = self.exclude_unhealthy(candidates).await;

        let strategy = options.strategy.unwrap_or(self.config.strategy);
        let ranked = strategy.rank(candidates);
        let budget = options
            .max_cost_per_request
            .or(self.config.max_cost_per_request);
        let ordered = apply_cost_gate(ranked, budget);

        debug!(
            url,
            %strategy,
            order = ?ordered.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "provider order resolved"
        );

        let request = self.resolve_request(target, &options);
        let max_retries = options
            .max_retries
            .unwrap_or(self.config.default_max_retries);
        let attempts = Mutex::new(Vec::new());

        let fallback = self.run_fallback(&ordered, &request, max_retries, &attempts);
        let outcome = match options.overall_deadline {
            Some(deadline) => tokio::time::timeout(deadline, fallback)
                .await
                .unwrap_or_else(|_| {
                    warn!(url, ?deadline, "overall deadline elapsed, aborting fallback loop");
                    None
                }),
            None => fallback.await,
        };

        match outcome {
            Some(result) => {
                info!(
                    url,
                    provider = %result.provider_used,
                    status = result.status,
                    elapsed_ms = result.response_time.as_millis() as u64,
                    "scrape succeeded"
                );
                Ok(result)
            }
            None => Err(ScrapeError::AllProvidersFailed {
                attempts: attempts.into_inner(),
            }),
        }
    }

    /// Exercise exactly one named provider, bypassing ranking and fallback
    ///
    /// Administrative escape hatch for diagnostics and benchmarking; never
    /// part of normal request flow. Filtering, health exclusion, and the
    /// cost gate do not apply; only the named provider's retry loop runs.
    pub async fn test_provider(
        &self,
        name: &str,
        url: &str,
        options: ScrapeOptions,
    ) -> Result<ScrapeResult, ScrapeError> {
        let target = validate_url(url)?;

        let provider = {
            let providers = self.providers.read().await;
            providers.iter().find(|p| p.name() == name).cloned()
        };
        let provider = provider.ok_or_else(|| {
            ScrapeError::NoSuitableProviders(format!("no provider named '{name}' is registered"))
        })?;

        let request = self.resolve_request(target, &options);
        let max_retries = options
            .max_retries
            .unwrap_or(self.config.default_max_retries);
        let attempts = Mutex::new(Vec::new());

        match fetch_with_retries(
            provider.as_ref(),
            &request,
            max_retries,
            &self.config.backoff,
            self.sleeper.as_ref(),
            &attempts,
        )
        .await
        {
            Some(result) => Ok(result),
            None => Err(ScrapeError::AllProvidersFailed {
                attempts: attempts.into_inner(),
            }),
        }
    }

    /// Current health verdict for every registered provider
    ///
    /// Monitoring handoff; not part of the hot path.
    pub async fn providers_health(&self) -> Vec<(String, HealthStatus)> {
        let providers = self.providers.read().await.clone();
        let mut verdicts = Vec::with_capacity(providers.len());
        for provider in providers {
            verdicts.push((provider.name().to_string(), provider.health_status().await));
        }
        verdicts
    }

    /// Metrics snapshot for every registered provider
    ///
    /// Snapshots are idempotent: two calls with no intervening scrapes
    /// return identical values.
    pub async fn metrics(&self) -> HashMap<String, MetricsSnapshot> {
        let providers = self.providers.read().await;
        providers
            .iter()
            .map(|p| (p.name().to_string(), p.metrics().snapshot()))
            .collect()
    }

    /// Zero every provider's metrics (explicit operator action)
    pub async fn reset_metrics(&self) {
        let providers = self.providers.read().await;
        for provider in providers.iter() {
            provider.metrics().reset();
        }
    }

    /// Release every provider's held resources
    ///
    /// Guaranteed-effort shutdown: each provider's cleanup runs regardless
    /// of earlier failures, and failures are aggregated into the report.
    pub async fn cleanup(&self) -> CleanupReport {
        let providers = self.providers.read().await.clone();
        let mut errors = Vec::new();

        for provider in providers {
            debug!(provider = provider.name(), "cleaning up provider");
            if let Err(e) = provider.cleanup().await {
                warn!(provider = provider.name(), error = %e, "provider cleanup failed");
                errors.push(format!("{}: {e:#}", provider.name()));
            }
        }

        if errors.is_empty() {
            CleanupReport::Success
        } else {
            CleanupReport::PartialFailure(errors)
        }
    }

    /// Apply the allow-list and capability filters
    ///
    /// An empty survivor set here is a configuration/capability mismatch,
    /// distinct from "all attempts failed", which requires attempts.
    async fn eligible_providers(
        &self,
        options: &ScrapeOptions,
    ) -> Result<Vec<Arc<dyn FetchProvider>>, ScrapeError> {
        let providers = self.providers.read().await.clone();
        if providers.is_empty() {
            return Err(ScrapeError::NoSuitableProviders(
                "no providers are registered".to_string(),
            ));
        }
        let registered = providers.len();

        let eligible: Vec<_> = providers
            .into_iter()
            .filter(|p| {
                self.config.enabled_providers.is_empty()
                    || self.config.enabled_providers.iter().any(|n| n == p.name())
            })
            .filter(|p| options.required_capabilities.satisfied_by(p.capabilities()))
            .collect();

        if eligible.is_empty() {
            return Err(ScrapeError::NoSuitableProviders(format!(
                "0 of {registered} registered providers are enabled and satisfy {:?}",
                options.required_capabilities
            )));
        }
        Ok(eligible)
    }

    /// Drop providers whose availability probe fails, for this call only
    ///
    /// Exclusion is never sticky; a recovering provider is ranked again on
    /// the very next call. When every candidate probes unhealthy the
    /// exclusion is waived: probes are advisory, and attempting a suspect
    /// provider yields a real attempt error instead of an empty verdict.
    async fn exclude_unhealthy(
        &self,
        candidates: Vec<Arc<dyn FetchProvider>>,
    ) -> Vec<Arc<dyn FetchProvider>> {
        let mut healthy = Vec::with_capacity(candidates.len());
        for provider in &candidates {
            let status = provider.health_status().await;
            if status.is_healthy {
                healthy.push(Arc::clone(provider));
            } else {
                debug!(
                    provider = provider.name(),
                    message = %status.message,
                    "excluding unhealthy provider for this call"
                );
            }
        }

        if healthy.is_empty() {
            warn!("every eligible provider probed unhealthy, attempting all of them anyway");
            candidates
        } else {
            healthy
        }
    }

    /// Merge caller options with configured defaults into a fetch request
    fn resolve_request(&self, url: Url, options: &ScrapeOptions) -> FetchRequest {
        FetchRequest {
            url,
            timeout: options.timeout.unwrap_or(self.config.default_timeout),
            user_agent: options.user_agent.clone(),
            headers: options.headers.clone(),
            min_content_length: self.config.min_content_length,
        }
    }

    /// Walk the ranked list, strictly in order, until a provider succeeds
    ///
    /// Providers are never raced against each other for one logical
    /// request: speculative parallel fetches would double-bill commercial
    /// backends and defeat cost optimization.
    async fn run_fallback(
        &self,
        ordered: &[Arc<dyn FetchProvider>],
        request: &FetchRequest,
        max_retries: u32,
        attempts: &Mutex<Vec<AttemptRecord>>,
    ) -> Option<ScrapeResult> {
        for provider in ordered {
            debug!(provider = provider.name(), url = %request.url, "trying provider");
            if let Some(result) = fetch_with_retries(
                provider.as_ref(),
                request,
                max_retries,
                &self.config.backoff,
                self.sleeper.as_ref(),
                attempts,
            )
            .await
            {
                return Some(result);
            }
            debug!(
                provider = provider.name(),
                "provider exhausted, advancing to next candidate"
            );
        }
        None
    }
}

/// Parse and sanity-check the target URL before any provider is touched
fn validate_url(url: &str) -> Result<Url, ScrapeError> {
    let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed)
}

/// Demote over-budget providers to the end of the ranked list
///
/// They are never removed outright: the call must still succeed through an
/// over-budget provider when it is the only one that works, because
/// correctness outranks budget.
fn apply_cost_gate(
    ranked: Vec<Arc<dyn FetchProvider>>,
    budget: Option<f64>,
) -> Vec<Arc<dyn FetchProvider>> {
    let Some(budget) = budget else {
        return ranked;
    };

    let (within, over): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .partition(|p| p.capabilities().cost_per_request <= budget);

    if !over.is_empty() {
        debug!(
            budget,
            demoted = ?over.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "providers over budget demoted to end of ranking"
        );
    }

    within.into_iter().chain(over).collect()
}
