//! scrapeflow: provider fallback orchestration for web page fetching
//!
//! Fetches a target page through one of several interchangeable backend
//! providers (free relay chain, headless browser, commercial API), retrying
//! and falling back across them until one succeeds or all are exhausted.
//! Provider selection is strategy-driven and informed by live per-provider
//! health and rolling metrics.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod utils;

pub use config::{OrchestratorConfig, ScrapeOptions};
pub use orchestrator::{
    AttemptRecord, BackoffPolicy, CleanupReport, ProviderManager, ScrapeError, SelectionStrategy,
    Sleeper, TokioSleeper,
};
pub use provider::{
    BrowserProvider, BrowserProviderConfig, CommercialApiConfig, CommercialApiProvider,
    FetchError, FetchProvider, FetchRequest, HealthStatus, MetricsSnapshot, ProviderCapabilities,
    ProviderCore, ProviderMetrics, RawFetch, RelayConfig, RelayProvider, RequiredCapabilities,
    ResultMetadata, ScrapeResult,
};
