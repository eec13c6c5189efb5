//! Caller-facing error taxonomy for the orchestration engine
//!
//! Only three failure modes cross the boundary: invalid input, an empty
//! candidate set after filtering, and full exhaustion of every ranked
//! provider. Everything below that is recovered locally by the fallback
//! loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One failed fetch attempt, kept for the aggregated terminal error
///
/// Exists only for the duration of one fallback loop: accumulated into
/// [`ScrapeError::AllProvidersFailed`] on exhaustion, discarded on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Registered name of the provider that failed
    pub provider: String,
    /// Why the attempt failed
    pub error: String,
    /// Wall-clock time the attempt took
    pub elapsed: Duration,
}

/// Terminal failures surfaced to the caller
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Malformed target URL; rejected before any provider is touched
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Filtering left zero candidates; a configuration or capability
    /// mismatch, not a transient failure
    #[error("no suitable providers: {0}")]
    NoSuitableProviders(String),

    /// Every ranked candidate exhausted its retries
    ///
    /// The message enumerates each attempt so operators can see why every
    /// provider failed, not just that all did.
    #[error("{}", summarize_attempts(.attempts))]
    AllProvidersFailed { attempts: Vec<AttemptRecord> },
}

/// Render the full attempt list into one operator-readable line
fn summarize_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "all providers failed: no attempts completed before the deadline".to_string();
    }

    let detail = attempts
        .iter()
        .map(|a| format!("{}: {}", a.provider, a.error))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "all providers failed after {} attempts: {detail}",
        attempts.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_message_names_every_provider_and_reason() {
        let err = ScrapeError::AllProvidersFailed {
            attempts: vec![
                AttemptRecord {
                    provider: "relay".to_string(),
                    error: "network error: connection refused".to_string(),
                    elapsed: Duration::from_millis(120),
                },
                AttemptRecord {
                    provider: "browser".to_string(),
                    error: "navigation failed: timeout".to_string(),
                    elapsed: Duration::from_secs(30),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("relay"));
        assert!(message.contains("connection refused"));
        assert!(message.contains("browser"));
        assert!(message.contains("navigation failed"));
        assert!(message.contains("2 attempts"));
    }

    #[test]
    fn empty_attempt_list_mentions_the_deadline() {
        let err = ScrapeError::AllProvidersFailed { attempts: vec![] };
        assert!(err.to_string().contains("deadline"));
    }
}
