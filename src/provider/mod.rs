//! Provider contract and concrete fetch backends
//!
//! Every backend fetcher implements the [`FetchProvider`] trait: one uniform
//! contract over backends with very different cost, latency, and capability
//! profiles. Polymorphism is a trait object registry, not a class hierarchy;
//! shared state lives in an embedded [`ProviderCore`] each implementation
//! owns by composition.
//!
//! The attempt pipeline (timeout, panic containment, response validation,
//! metrics recording) is a provided trait method so every backend gets
//! identical semantics: exactly one metrics update per completed attempt,
//! and no panic ever escapes the provider boundary.

// Sub-modules
pub mod browser;
pub mod capabilities;
pub mod commercial;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod relay;
pub mod types;

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::Semaphore;

pub use browser::{BrowserProvider, BrowserProviderConfig};
pub use capabilities::{ProviderCapabilities, RequiredCapabilities};
pub use commercial::{CommercialApiConfig, CommercialApiProvider};
pub use errors::{FetchError, panic_message};
pub use health::HealthStatus;
pub use metrics::{MetricsSnapshot, ProviderMetrics};
pub use relay::{RelayConfig, RelayProvider};
pub use types::{FetchRequest, RawFetch, ResultMetadata, ScrapeResult};

/// Identity, capabilities, metrics, and concurrency cap for one provider
///
/// Concrete providers embed one of these instead of inheriting shared
/// mutable state. The semaphore enforces the descriptor's
/// `max_concurrency` on the shared fetch path.
#[derive(Debug)]
pub struct ProviderCore {
    name: String,
    capabilities: ProviderCapabilities,
    metrics: ProviderMetrics,
    limiter: Semaphore,
}

impl ProviderCore {
    /// Build the core for a provider with the given registered name
    #[must_use]
    pub fn new(name: impl Into<String>, capabilities: ProviderCapabilities) -> Self {
        let permits = capabilities.max_concurrency.max(1);
        Self {
            name: name.into(),
            capabilities,
            metrics: ProviderMetrics::new(),
            limiter: Semaphore::new(permits),
        }
    }

    /// Registered provider name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Immutable capability descriptor
    #[must_use]
    pub fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    /// This provider's rolling metrics
    #[must_use]
    pub fn metrics(&self) -> &ProviderMetrics {
        &self.metrics
    }
}

/// Uniform contract for one fetch backend
///
/// Implementations provide the raw network operation (`fetch_raw`) and a
/// cheap availability probe (`is_available`); the provided methods supply
/// the rest of the contract.
#[async_trait]
pub trait FetchProvider: Send + Sync {
    /// Shared identity, capabilities, metrics, and concurrency state
    fn core(&self) -> &ProviderCore;

    /// Registered provider name
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Immutable capability descriptor
    fn capabilities(&self) -> &ProviderCapabilities {
        self.core().capabilities()
    }

    /// Rolling metrics owned by this provider
    fn metrics(&self) -> &ProviderMetrics {
        self.core().metrics()
    }

    /// Backend-specific network operation for one attempt
    ///
    /// Must not touch metrics; the shared `fetch` path records the outcome
    /// exactly once after validation.
    async fn fetch_raw(&self, request: &FetchRequest) -> Result<RawFetch, FetchError>;

    /// Cheap, side-effect-free availability probe
    ///
    /// Probes a known-good endpoint or checks held resources. Never updates
    /// request metrics: availability checks are not requests against the
    /// target workload.
    async fn is_available(&self) -> bool;

    /// Execute one attempt: timeout, panic containment, validation, and
    /// exactly one metrics update
    ///
    /// The strategy selector depends on freshly-updated metrics for the next
    /// call, so recording here is a hard part of the contract rather than
    /// optional instrumentation. A panic inside `fetch_raw` is caught and
    /// converted into a [`FetchError::Panicked`] attempt failure.
    async fn fetch(&self, request: &FetchRequest) -> Result<ScrapeResult, FetchError> {
        let _permit = self
            .core()
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::Unavailable("provider is shut down".to_string()))?;

        let started = Instant::now();
        let attempt = AssertUnwindSafe(self.fetch_raw(request)).catch_unwind();
        let raw = match tokio::time::timeout(request.timeout, attempt).await {
            Err(_) => Err(FetchError::Timeout(request.timeout)),
            Ok(Err(payload)) => Err(FetchError::Panicked(panic_message(payload))),
            Ok(Ok(outcome)) => outcome,
        };
        let validated = raw.and_then(|raw| validate_raw(raw, request));
        let elapsed = started.elapsed();

        match validated {
            Ok(raw) => {
                let cost = self.capabilities().cost_per_request;
                self.metrics().record_success(elapsed, cost);
                tracing::debug!(
                    provider = self.name(),
                    status = raw.status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "fetch attempt succeeded"
                );
                Ok(ScrapeResult::from_raw(raw, self.name(), cost, elapsed))
            }
            Err(err) => {
                self.metrics().record_failure();
                tracing::debug!(
                    provider = self.name(),
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "fetch attempt failed"
                );
                Err(err)
            }
        }
    }

    /// Compose the availability probe into a health verdict
    ///
    /// Fails soft: a probe error or panic becomes `is_healthy = false` with
    /// a message describing the probe failure, never a propagated error.
    async fn health_status(&self) -> HealthStatus {
        match AssertUnwindSafe(self.is_available()).catch_unwind().await {
            Ok(true) => HealthStatus::healthy(format!("{} availability probe succeeded", self.name())),
            Ok(false) => {
                HealthStatus::unhealthy(format!("{} availability probe reported unavailable", self.name()))
            }
            Err(payload) => HealthStatus::unhealthy(format!(
                "{} availability probe panicked: {}",
                self.name(),
                panic_message(payload)
            )),
        }
    }

    /// Release any resources this provider holds (browser session, pooled
    /// connections). Default is a no-op for stateless backends.
    async fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Validate a raw fetch against status and minimum-length rules
///
/// Non-2xx statuses and short bodies are attempt failures even though the
/// transport succeeded; a purely status-code-based check misses relay
/// backends that soft-fail with an empty 200.
fn validate_raw(raw: RawFetch, request: &FetchRequest) -> Result<RawFetch, FetchError> {
    if !(200..300).contains(&raw.status) {
        return Err(FetchError::HttpStatus(raw.status));
    }
    if raw.content.len() < request.min_content_length {
        return Err(FetchError::ContentTooShort {
            len: raw.content.len(),
            min: request.min_content_length,
        });
    }
    Ok(raw)
}
