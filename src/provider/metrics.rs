//! Rolling per-provider request metrics
//!
//! Every provider owns one `ProviderMetrics` instance and updates it exactly
//! once per completed fetch attempt. The cells are independent atomics so
//! parallel scrape calls can record outcomes without a shared lock; no
//! invariant spans more than a single cell update because the request count
//! is derived from the outcome counters rather than stored.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Fixed-point scaling factor for cost accumulation (micro-units)
///
/// Costs are fractional (e.g. $0.002 per request) but `AtomicU64` only holds
/// integers, so totals are accumulated in millionths of a cost unit.
const COST_SCALE: f64 = 1_000_000.0;

/// Smoothing factor for the response-time moving averages
///
/// 0.2 weights roughly the last ~10 successful requests, reacting to latency
/// shifts within a handful of calls without thrashing on one slow response.
const EWMA_ALPHA: f64 = 0.2;

/// Rolling request counters and latency averages for one provider
///
/// `request_count` is not stored: it is derived as `success + failure` in
/// every snapshot, so the counter invariant holds by construction no matter
/// how updates interleave.
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// EWMA of successful response times in microseconds, stored as f64 bits
    avg_response_micros: AtomicU64,
    /// EWMA of squared response times (micros^2), feeds the variance term
    /// of the reliability score
    avg_response_sq_micros: AtomicU64,
    /// Accumulated cost in fixed-point micro-units
    total_cost_micros: AtomicU64,
}

impl ProviderMetrics {
    /// Create a fresh metrics recorder with all counters at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful attempt
    ///
    /// Folds the response time into the rolling averages and adds the
    /// billable cost. Called exactly once per successful fetch attempt.
    pub fn record_success(&self, response_time: Duration, cost: f64) {
        let micros = response_time.as_micros() as f64;
        ewma_update(&self.avg_response_micros, micros);
        ewma_update(&self.avg_response_sq_micros, micros * micros);

        if cost > 0.0 {
            let scaled = (cost * COST_SCALE).round() as u64;
            self.total_cost_micros.fetch_add(scaled, Ordering::Relaxed);
        }

        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed attempt
    ///
    /// Failures never touch the latency averages: a timeout's elapsed time
    /// says nothing about how fast the provider serves real responses.
    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters
    ///
    /// Cheap and side-effect free. Two snapshots with no intervening
    /// attempts compare equal.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let success_count = self.success_count.load(Ordering::Relaxed);
        let failure_count = self.failure_count.load(Ordering::Relaxed);
        let request_count = success_count + failure_count;

        let avg_micros = f64::from_bits(self.avg_response_micros.load(Ordering::Relaxed));
        let avg_sq_micros = f64::from_bits(self.avg_response_sq_micros.load(Ordering::Relaxed));

        // E[x^2] - E[x]^2, floored at zero against EWMA rounding drift
        let variance = (avg_sq_micros - avg_micros * avg_micros).max(0.0);

        MetricsSnapshot {
            request_count,
            success_count,
            failure_count,
            success_rate: if request_count == 0 {
                0.0
            } else {
                success_count as f64 / request_count as f64
            },
            avg_response_time: Duration::from_micros(avg_micros as u64),
            response_time_stddev: Duration::from_micros(variance.sqrt() as u64),
            total_cost: self.total_cost_micros.load(Ordering::Relaxed) as f64 / COST_SCALE,
        }
    }

    /// Zero every counter
    ///
    /// Explicit operator action only (e.g. a test harness resetting between
    /// runs); nothing in the request path ever resets metrics.
    pub fn reset(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.avg_response_micros.store(0, Ordering::Relaxed);
        self.avg_response_sq_micros.store(0, Ordering::Relaxed);
        self.total_cost_micros.store(0, Ordering::Relaxed);
    }
}

/// Fold a sample into an EWMA cell holding f64 bits
///
/// A zero cell (bit pattern of 0.0) means no samples yet, so the first
/// sample seeds the average directly instead of being smoothed toward zero.
/// CAS loop retries on contention, same shape as the token-bucket refill.
fn ewma_update(cell: &AtomicU64, sample: f64) {
    loop {
        let bits = cell.load(Ordering::Relaxed);
        let next = if bits == 0 {
            sample
        } else {
            let current = f64::from_bits(bits);
            current + EWMA_ALPHA * (sample - current)
        };

        match cell.compare_exchange_weak(bits, next.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => break,
            Err(_) => continue,
        }
    }
}

/// Immutable view of one provider's metrics at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// `success_count / request_count`, 0 when no requests have completed
    pub success_rate: f64,
    /// Rolling average over successful attempts only
    pub avg_response_time: Duration,
    /// Rolling standard deviation over successful attempts only
    pub response_time_stddev: Duration,
    /// Sum of `cost_per_request` over successful billable attempts
    pub total_cost: f64,
}
