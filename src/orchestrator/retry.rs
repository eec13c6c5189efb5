//! Bounded retry loop with backoff for one provider
//!
//! Retry control flow is an explicit loop with an injectable sleeper so the
//! backoff schedule is testable without real wall-clock waits. Every failed
//! attempt is pushed into the shared attempt log as it happens, which keeps
//! the record intact even when a caller-level deadline cancels the loop
//! mid-provider.

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::errors::AttemptRecord;
use crate::provider::{FetchProvider, FetchRequest, ScrapeResult};

/// Bounded exponential-style backoff schedule
///
/// Delay after failed attempt `n` is `base_delay · multiplier^n`, capped at
/// `max_delay`, with up to `jitter` relative randomization so parallel
/// callers do not hammer a struggling backend in lockstep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Relative jitter in [0, 1]; 0.2 means ±20%
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after the given zero-based failed attempt
    #[must_use]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exact = self.base_delay.as_secs_f64() * self.multiplier.powi(failed_attempt as i32);
        let capped = exact.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter > 0.0 {
            let spread = rand::rng().random_range(-self.jitter..=self.jitter);
            capped * (1.0 + spread)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered.clamp(0.0, self.max_delay.as_secs_f64()))
    }
}

/// Injectable delay used between attempts
///
/// Production uses [`TokioSleeper`]; tests swap in a recorder so the
/// schedule runs instantly.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt one provider up to `max_retries + 1` times
///
/// Returns the first successful result, or `None` once the provider's
/// attempt budget is exhausted; every failure is appended to `attempts`
/// before the next try so the aggregated error always reflects completed
/// attempts.
pub async fn fetch_with_retries(
    provider: &dyn FetchProvider,
    request: &FetchRequest,
    max_retries: u32,
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    attempts: &Mutex<Vec<AttemptRecord>>,
) -> Option<ScrapeResult> {
    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt - 1);
            debug!(
                "retrying {} (attempt {}/{}) after {delay:?}",
                provider.name(),
                attempt + 1,
                max_retries + 1
            );
            sleeper.sleep(delay).await;
        }

        let started = Instant::now();
        match provider.fetch(request).await {
            Ok(result) => return Some(result),
            Err(err) => {
                warn!(
                    "attempt {}/{} via {} failed: {err}",
                    attempt + 1,
                    max_retries + 1,
                    provider.name()
                );
                attempts.lock().push(AttemptRecord {
                    provider: provider.name().to_string(),
                    error: err.to_string(),
                    elapsed: started.elapsed(),
                });
            }
        }
    }
    None
}
