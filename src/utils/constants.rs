//! Shared configuration constants for scrapeflow
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Default per-attempt fetch timeout: 30 seconds
///
/// Long enough for slow origin servers and relay hops, short enough that a
/// hung backend does not stall the fallback loop. Callers can override per
/// request via `ScrapeOptions::timeout`.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry budget per provider: 2 retries (3 attempts total)
///
/// Transient network failures usually clear within one or two retries.
/// More retries delay fallback to the next ranked provider without
/// meaningfully improving success rates.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Minimum acceptable response body length in bytes
///
/// Some relay backends return a technically-200 but empty or placeholder
/// body on soft failure. Anything shorter than this is treated as an
/// attempt failure regardless of status code.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 64;

/// Response time ceiling used when normalizing latency into a score
///
/// A provider averaging at or above this is scored as maximally slow by the
/// reliability ranking. 30 seconds matches the default fetch timeout.
pub const RESPONSE_TIME_CEILING: Duration = Duration::from_secs(30);

/// Neutral reliability prior for providers with no completed requests
///
/// A fresh provider is neither favored nor excluded before it has a track
/// record.
pub const NEUTRAL_RELIABILITY_PRIOR: f64 = 0.5;

/// Known-good endpoint for availability probes
///
/// Returns an empty 204 and is served from highly-available infrastructure,
/// making it a cheap connectivity check that never skews request metrics.
pub const DEFAULT_PROBE_URL: &str = "https://www.gstatic.com/generate_204";

/// Chrome user agent string sent by default on plain HTTP fetches
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Maximum redirect hops followed by the HTTP-based providers
pub const MAX_REDIRECT_HOPS: u32 = 10;
