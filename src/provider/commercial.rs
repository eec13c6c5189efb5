//! Commercial enterprise scraping API provider
//!
//! Wraps a paid scraping API: every successful request is billed at the
//! configured per-request cost, in exchange for JavaScript rendering and
//! anti-bot evasion the free backends cannot offer. The cost gate in the
//! orchestrator demotes this provider to the end of the ranked list when a
//! budget is set, so it is typically the backend of last resort.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use anyhow::{Context, Result};

use super::{
    FetchError, FetchProvider, FetchRequest, ProviderCapabilities, ProviderCore, RawFetch,
};

/// Configuration for a commercial scraping API backend
#[derive(Debug, Clone)]
pub struct CommercialApiConfig {
    /// Scrape endpoint, e.g. `https://api.example.com/v1/scrape`
    pub endpoint: String,
    /// Account API key, sent as a bearer token
    pub api_key: String,
    /// Account/status endpoint for the availability probe; defaults to
    /// `{endpoint}/status`
    pub status_url: Option<String>,
    /// Cost billed per successful request
    pub cost_per_request: f64,
    /// Expected response time before any samples exist
    pub response_time_hint: Duration,
    /// Concurrent in-flight fetch cap (plan-dependent)
    pub max_concurrency: usize,
}

impl Default for CommercialApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            status_url: None,
            cost_per_request: 0.01,
            response_time_hint: Duration::from_secs(6),
            max_concurrency: 4,
        }
    }
}

/// Request body sent to the scrape endpoint
#[derive(Debug, Serialize)]
struct ApiScrapeRequest<'a> {
    url: &'a str,
    render_js: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<&'a str>,
    headers: &'a HashMap<String, String>,
}

/// Response body returned by the scrape endpoint
///
/// `status_code` is the status the API observed at the target origin, which
/// is what the shared validation path cares about; the API's own transport
/// status is checked separately.
#[derive(Debug, Deserialize)]
struct ApiScrapePayload {
    content: String,
    #[serde(default = "default_status")]
    status_code: u16,
    #[serde(default)]
    resolved_url: Option<String>,
    #[serde(default)]
    redirect_count: u32,
    #[serde(default)]
    meta: HashMap<String, serde_json::Value>,
}

fn default_status() -> u16 {
    200
}

/// Paid scraping API provider over `reqwest`
pub struct CommercialApiProvider {
    core: ProviderCore,
    client: reqwest::Client,
    endpoint: String,
    status_url: String,
    api_key: String,
}

impl CommercialApiProvider {
    /// Build a commercial provider with the given registered name
    ///
    /// # Errors
    /// Returns an error when the endpoint is empty or the HTTP client
    /// cannot be constructed.
    pub fn new(name: impl Into<String>, config: CommercialApiConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.endpoint.is_empty(),
            "commercial API endpoint must be set"
        );

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build commercial API client")?;

        let capabilities = ProviderCapabilities {
            supports_javascript: true,
            supports_anti_bot_evasion: true,
            is_commercial: true,
            cost_per_request: config.cost_per_request,
            max_concurrency: config.max_concurrency,
            response_time_hint: config.response_time_hint,
        };

        let status_url = config
            .status_url
            .unwrap_or_else(|| format!("{}/status", config.endpoint.trim_end_matches('/')));

        Ok(Self {
            core: ProviderCore::new(name, capabilities),
            client,
            endpoint: config.endpoint,
            status_url,
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl FetchProvider for CommercialApiProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    async fn fetch_raw(&self, request: &FetchRequest) -> Result<RawFetch, FetchError> {
        debug!(provider = self.name(), url = %request.url, "dispatching to commercial API");

        let body = ApiScrapeRequest {
            url: request.url.as_str(),
            render_js: true,
            user_agent: request.user_agent.as_deref(),
            headers: &request.headers,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let api_status = response.status();
        if !api_status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!(
                "scrape endpoint returned {api_status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: ApiScrapePayload = response
            .json()
            .await
            .map_err(|e| FetchError::Api(format!("malformed scrape payload: {e}")))?;

        let final_url = payload
            .resolved_url
            .unwrap_or_else(|| request.url.to_string());

        Ok(RawFetch {
            content: payload.content,
            status: payload.status_code,
            final_url,
            redirect_count: payload.redirect_count,
            extra: payload.meta,
        })
    }

    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(&self.status_url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match probe {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(
                    provider = self.name(),
                    status = %response.status(),
                    "commercial API status probe rejected"
                );
                false
            }
            Err(e) => {
                warn!(provider = self.name(), error = %e, "commercial API status probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> CommercialApiConfig {
        CommercialApiConfig {
            endpoint: endpoint.to_string(),
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(CommercialApiProvider::new("api", CommercialApiConfig::default()).is_err());
    }

    #[test]
    fn status_url_defaults_to_endpoint_suffix() {
        let provider = CommercialApiProvider::new("api", config("https://api.example.com/v1/scrape/"))
            .expect("valid config builds");
        assert_eq!(provider.status_url, "https://api.example.com/v1/scrape/status");
    }

    #[test]
    fn commercial_capabilities_carry_cost_and_evasion() {
        let provider = CommercialApiProvider::new("api", config("https://api.example.com/v1/scrape"))
            .expect("valid config builds");
        let caps = provider.capabilities();
        assert!(caps.is_commercial);
        assert!(caps.supports_javascript);
        assert!(caps.supports_anti_bot_evasion);
        assert!(caps.cost_per_request > 0.0);
    }

    #[test]
    fn payload_defaults_fill_missing_fields() {
        let payload: ApiScrapePayload =
            serde_json::from_str(r#"{"content": "<html></html>"}"#).expect("minimal payload parses");
        assert_eq!(payload.status_code, 200);
        assert_eq!(payload.redirect_count, 0);
        assert!(payload.resolved_url.is_none());
    }
}
