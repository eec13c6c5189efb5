//! Request and result types shared by all providers
//!
//! `FetchRequest` is the fully-resolved input a provider receives (the
//! orchestrator has already merged caller options with its own defaults).
//! `RawFetch` is what a provider's network operation returns; the provider
//! contract normalizes it into a `ScrapeResult` on success.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// One fully-resolved fetch request handed to a provider
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Validated target URL
    pub url: Url,
    /// Per-attempt timeout; elapsing counts as an attempt failure
    pub timeout: Duration,
    /// User agent override; providers fall back to their own default
    pub user_agent: Option<String>,
    /// Extra request headers
    pub headers: HashMap<String, String>,
    /// Bodies shorter than this are soft failures regardless of status
    pub min_content_length: usize,
}

/// Raw outcome of a provider's network operation, before normalization
///
/// Providers fill in what their backend can observe; the shared fetch path
/// validates the status and body and stamps timing, cost, and identity.
#[derive(Debug, Clone)]
pub struct RawFetch {
    /// Raw document body
    pub content: String,
    /// Protocol-level status of the final response
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    /// Number of redirect hops taken
    pub redirect_count: u32,
    /// Provider-specific extras (relay endpoint used, render time, ...)
    pub extra: HashMap<String, serde_json::Value>,
}

/// Successful scrape outcome, only ever constructed for a completed fetch
///
/// Failures never populate partial results; they surface as attempt records
/// inside the aggregated error instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Raw fetched document, the sole handoff to the extraction pipeline
    pub content: String,
    /// Protocol-level status code
    pub status: u16,
    /// Wall-clock time of the successful attempt
    pub response_time: Duration,
    /// Registered name of the provider that produced this result
    pub provider_used: String,
    /// Cost billed for this request
    pub cost: f64,
    /// Request identity and redirect bookkeeping
    pub metadata: ResultMetadata,
}

/// Identity and trace metadata attached to every result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Unique id for correlating logs and downstream records
    pub request_id: Uuid,
    /// Final URL after redirects
    pub final_url: String,
    /// Redirect hops taken
    pub redirect_count: u32,
    /// Provider-specific extras
    pub extra: HashMap<String, serde_json::Value>,
}

impl ScrapeResult {
    /// Normalize a raw provider outcome into the public result shape
    #[must_use]
    pub fn from_raw(
        raw: RawFetch,
        provider: &str,
        cost: f64,
        response_time: Duration,
    ) -> Self {
        Self {
            content: raw.content,
            status: raw.status,
            response_time,
            provider_used: provider.to_string(),
            cost,
            metadata: ResultMetadata {
                request_id: Uuid::new_v4(),
                final_url: raw.final_url,
                redirect_count: raw.redirect_count,
                extra: raw.extra,
            },
        }
    }
}
