//! Per-attempt fetch error taxonomy
//!
//! These errors describe why a single attempt against a single provider
//! failed. They never cross the orchestrator boundary directly: the fallback
//! loop records them as attempt failures and either advances to the next
//! attempt/provider or aggregates them into the terminal error.

use std::time::Duration;
use thiserror::Error;

/// Failure of one fetch attempt against one provider
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, reset)
    #[error("network error: {0}")]
    Network(String),

    /// The per-attempt timeout elapsed; the in-flight operation was abandoned
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The target responded with a non-2xx status
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Body shorter than the configured minimum; treated as a soft failure
    /// even on a 200 because some relay backends return placeholder bodies
    #[error("response body too short: {len} bytes (minimum {min})")]
    ContentTooShort { len: usize, min: usize },

    /// Headless browser failure (launch, navigation, CDP session)
    #[error("browser error: {0}")]
    Browser(String),

    /// Commercial API rejected or mangled the request
    #[error("api error: {0}")]
    Api(String),

    /// Provider cannot take requests right now (closed semaphore, missing
    /// binary, shut down)
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider's fetch panicked; caught at the provider boundary so one
    /// broken backend cannot take down the fallback loop
    #[error("provider panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the full context chain from provider internals
        Self::Network(format!("{err:#}"))
    }
}

/// Render a caught panic payload as text
///
/// Panic payloads are `&str` or `String` in practice; anything else gets a
/// placeholder rather than being rethrown.
#[must_use]
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
