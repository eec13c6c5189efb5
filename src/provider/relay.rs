//! Zero-cost relay-chain fetch provider
//!
//! Fetches pages through a rotating list of relay proxy endpoints (direct
//! connection when the list is empty). Free to operate, but relays are slow
//! and flaky compared to the other backends, so this provider leans on the
//! orchestrator's retry loop and the minimum-content-length validation to
//! weed out placeholder bodies relays serve on soft failure.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use super::{
    FetchError, FetchProvider, FetchRequest, ProviderCapabilities, ProviderCore, RawFetch,
};
use crate::utils::constants::{DEFAULT_PROBE_URL, DEFAULT_USER_AGENT, MAX_REDIRECT_HOPS};

/// Configuration for the relay-chain provider
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay proxy endpoints, e.g. `socks5://127.0.0.1:9050`; empty means
    /// a direct connection
    pub relays: Vec<String>,
    /// Endpoint used by the availability probe
    pub probe_url: String,
    /// Expected response time before any samples exist
    pub response_time_hint: Duration,
    /// Concurrent in-flight fetch cap
    pub max_concurrency: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relays: Vec::new(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            response_time_hint: Duration::from_secs(4),
            max_concurrency: 8,
        }
    }
}

/// Free relay-chain provider over `reqwest`
///
/// One client per relay endpoint; fetches rotate through them round-robin so
/// a single saturated exit does not absorb every request. Redirects are
/// followed manually so the hop count survives into result metadata.
pub struct RelayProvider {
    core: ProviderCore,
    /// (endpoint label, client) pairs; "direct" when no relays configured
    clients: Vec<(String, reqwest::Client)>,
    cursor: AtomicUsize,
    probe_url: String,
}

impl RelayProvider {
    /// Build a relay provider with the given registered name
    ///
    /// # Errors
    /// Returns an error when a relay endpoint cannot be parsed as a proxy
    /// URL or a client cannot be constructed.
    pub fn new(name: impl Into<String>, config: RelayConfig) -> Result<Self> {
        let mut clients = Vec::new();

        if config.relays.is_empty() {
            clients.push(("direct".to_string(), build_client(None)?));
        } else {
            for relay in &config.relays {
                clients.push((relay.clone(), build_client(Some(relay))?));
            }
        }

        let capabilities = ProviderCapabilities {
            supports_javascript: false,
            supports_anti_bot_evasion: false,
            is_commercial: false,
            cost_per_request: 0.0,
            max_concurrency: config.max_concurrency,
            response_time_hint: config.response_time_hint,
        };

        Ok(Self {
            core: ProviderCore::new(name, capabilities),
            clients,
            cursor: AtomicUsize::new(0),
            probe_url: config.probe_url,
        })
    }

    /// Pick the next relay client round-robin
    fn next_client(&self) -> &(String, reqwest::Client) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }
}

/// Build a client for one relay endpoint (or a direct client)
///
/// Redirects are disabled at the client level; the fetch path follows them
/// manually to keep an accurate hop count.
fn build_client(relay: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(DEFAULT_USER_AGENT)
        .connect_timeout(Duration::from_secs(10));

    if let Some(endpoint) = relay {
        let proxy = reqwest::Proxy::all(endpoint)
            .with_context(|| format!("invalid relay endpoint: {endpoint}"))?;
        builder = builder.proxy(proxy);
    }

    builder.build().context("failed to build relay HTTP client")
}

#[async_trait]
impl FetchProvider for RelayProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    async fn fetch_raw(&self, request: &FetchRequest) -> Result<RawFetch, FetchError> {
        let (endpoint, client) = self.next_client();
        debug!("relay fetch for {} via {endpoint}", request.url);

        let mut current = request.url.clone();
        let mut hops = 0u32;

        loop {
            let mut builder = client.get(current.as_str());
            if let Some(agent) = &request.user_agent {
                builder = builder.header(reqwest::header::USER_AGENT, agent.as_str());
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let status = response.status();

            if status.is_redirection() && hops < MAX_REDIRECT_HOPS {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                if let Some(target) = location {
                    current = current
                        .join(&target)
                        .map_err(|e| FetchError::Network(format!("bad redirect target {target}: {e}")))?;
                    hops += 1;
                    debug!("relay redirect {hops} -> {current}");
                    continue;
                }
                // 3xx without a Location header falls through to validation
            }

            let final_url = response.url().to_string();
            let content = response
                .text()
                .await
                .map_err(|e| FetchError::Network(format!("failed to read body: {e}")))?;

            let mut extra = HashMap::new();
            extra.insert(
                "relay_endpoint".to_string(),
                serde_json::Value::String(endpoint.clone()),
            );

            return Ok(RawFetch {
                content,
                status: status.as_u16(),
                final_url,
                redirect_count: hops,
                extra,
            });
        }
    }

    async fn is_available(&self) -> bool {
        let (endpoint, client) = self.next_client();
        let probe = client
            .head(&self.probe_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match probe {
            Ok(response) => {
                let ok = response.status().is_success() || response.status().is_redirection();
                if !ok {
                    warn!(
                        "relay probe via {endpoint} returned status {}",
                        response.status()
                    );
                }
                ok
            }
            Err(e) => {
                warn!("relay probe via {endpoint} failed: {e}");
                false
            }
        }
    }
}
