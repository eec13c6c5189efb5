//! Orchestration engine
//!
//! This module contains the top-level coordinator and its supporting
//! pieces: the caller-facing error taxonomy, the ranking strategies, and
//! the bounded retry loop.

// Sub-modules
pub mod errors;
pub mod manager;
pub mod retry;
pub mod strategy;

// Re-exports for public API
pub use errors::{AttemptRecord, ScrapeError};
pub use manager::{CleanupReport, ProviderManager};
pub use retry::{BackoffPolicy, Sleeper, TokioSleeper};
pub use strategy::SelectionStrategy;
