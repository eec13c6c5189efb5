//! Provider ranking strategies
//!
//! Each strategy is a total order over the filtered candidate set. All
//! sorts are stable, so providers that compare equal keep their
//! registration order and ranking stays deterministic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::provider::{FetchProvider, MetricsSnapshot};
use crate::utils::constants::{NEUTRAL_RELIABILITY_PRIOR, RESPONSE_TIME_CEILING};

/// Named ranking policy applied to eligible providers for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Ascending cost; zero-cost providers first
    CostOptimized,
    /// Ascending observed latency, hint-based until samples exist
    SpeedOptimized,
    /// Descending composite reliability score
    #[default]
    ReliabilityFirst,
    /// JavaScript-capable providers first, reliability order within each
    /// partition; for requests that imply dynamic content
    JavascriptFirst,
}

impl SelectionStrategy {
    /// Rank candidates best-first under this strategy
    ///
    /// The input order is the registration order, which stable sorting
    /// preserves for ties.
    #[must_use]
    pub fn rank(
        &self,
        candidates: Vec<Arc<dyn FetchProvider>>,
    ) -> Vec<Arc<dyn FetchProvider>> {
        let mut ranked = candidates;
        match self {
            Self::CostOptimized => {
                ranked.sort_by(|a, b| {
                    total_cmp(
                        a.capabilities().cost_per_request,
                        b.capabilities().cost_per_request,
                    )
                });
            }
            Self::SpeedOptimized => {
                ranked.sort_by(|a, b| {
                    effective_response_time(a.as_ref()).cmp(&effective_response_time(b.as_ref()))
                });
            }
            Self::ReliabilityFirst => {
                ranked.sort_by(|a, b| {
                    // Descending: higher score first
                    total_cmp(reliability_score(b.as_ref()), reliability_score(a.as_ref()))
                });
            }
            Self::JavascriptFirst => {
                ranked.sort_by(|a, b| {
                    let js = b
                        .capabilities()
                        .supports_javascript
                        .cmp(&a.capabilities().supports_javascript);
                    js.then_with(|| {
                        total_cmp(reliability_score(b.as_ref()), reliability_score(a.as_ref()))
                    })
                });
            }
        }
        ranked
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CostOptimized => "cost-optimized",
            Self::SpeedOptimized => "speed-optimized",
            Self::ReliabilityFirst => "reliability-first",
            Self::JavascriptFirst => "javascript-first",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost-optimized" => Ok(Self::CostOptimized),
            "speed-optimized" => Ok(Self::SpeedOptimized),
            "reliability-first" => Ok(Self::ReliabilityFirst),
            "javascript-first" => Ok(Self::JavascriptFirst),
            other => Err(format!("unknown selection strategy: {other}")),
        }
    }
}

/// NaN-safe float comparison for sort keys
fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Observed average latency, falling back to the descriptor hint until the
/// provider has at least one completed success
fn effective_response_time(provider: &dyn FetchProvider) -> Duration {
    let snapshot = provider.metrics().snapshot();
    if snapshot.success_count > 0 {
        snapshot.avg_response_time
    } else {
        provider.capabilities().response_time_hint
    }
}

/// Composite reliability score in [0, 1]
///
/// `0.6·success_rate + 0.2·latency_score + 0.2·stability_score`, where the
/// latency score decays linearly to zero at the response-time ceiling and
/// the stability score penalizes latency variance. A provider with no
/// requests yet scores the neutral prior so it is neither favored nor
/// excluded before it has a track record.
fn reliability_score(provider: &dyn FetchProvider) -> f64 {
    let snapshot = provider.metrics().snapshot();
    if snapshot.request_count == 0 {
        return NEUTRAL_RELIABILITY_PRIOR;
    }

    let latency_ratio =
        snapshot.avg_response_time.as_secs_f64() / RESPONSE_TIME_CEILING.as_secs_f64();
    let latency_score = (1.0 - latency_ratio).max(0.0);

    let stability_score = 1.0 - normalized_variance(&snapshot);

    0.6 * snapshot.success_rate + 0.2 * latency_score + 0.2 * stability_score
}

/// Latency variance normalized into [0, 1]
///
/// Squared coefficient of variation (variance relative to the squared
/// mean), clamped: 0 means perfectly steady, 1 means the spread is at
/// least as large as the mean itself.
fn normalized_variance(snapshot: &MetricsSnapshot) -> f64 {
    let avg = snapshot.avg_response_time.as_secs_f64();
    if avg <= 0.0 {
        return 0.0;
    }
    let cv = snapshot.response_time_stddev.as_secs_f64() / avg;
    (cv * cv).min(1.0)
}
