//! Shared test fixtures: scripted mock providers and a no-wait sleeper

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scrapeflow::{
    FetchError, FetchProvider, FetchRequest, ProviderCapabilities, ProviderCore, RawFetch,
    Sleeper,
};

/// A response body comfortably above the default minimum content length
pub const PAGE_BODY: &str =
    "<html><head><title>fixture</title></head><body>scripted mock provider response body</body></html>";

/// Scripted outcome for one mock fetch attempt
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return a well-formed 200 page
    Success,
    /// Fail at the transport level
    FailNetwork(String),
    /// Return the given protocol status (non-2xx fails validation)
    Status(u16),
    /// Return a 200 with a placeholder-short body
    ShortBody,
    /// Panic inside the provider (must be contained at the boundary)
    Panic,
    /// Sleep before succeeding, for deadline tests
    SlowSuccess(Duration),
}

/// Scripted in-memory provider for orchestrator tests
///
/// Outcomes are consumed from the front of the script; once the script is
/// empty the default outcome repeats forever.
pub struct MockProvider {
    core: ProviderCore,
    script: Mutex<VecDeque<MockOutcome>>,
    default_outcome: MockOutcome,
    available: AtomicBool,
}

impl MockProvider {
    /// A provider that always succeeds, with default capabilities
    pub fn new(name: &str) -> Self {
        Self::with_capabilities(name, ProviderCapabilities::default())
    }

    /// A provider that always succeeds, with explicit capabilities
    pub fn with_capabilities(name: &str, capabilities: ProviderCapabilities) -> Self {
        Self {
            core: ProviderCore::new(name, capabilities),
            script: Mutex::new(VecDeque::new()),
            default_outcome: MockOutcome::Success,
            available: AtomicBool::new(true),
        }
    }

    /// Make every unscripted attempt produce this outcome
    #[must_use]
    pub fn default_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Queue outcomes consumed one per attempt before the default kicks in
    #[must_use]
    pub fn script(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    /// Control the availability probe result
    #[must_use]
    pub fn available(self, is_available: bool) -> Self {
        self.available.store(is_available, Ordering::Relaxed);
        self
    }

    /// Flip the availability probe result on a live provider
    pub fn set_available(&self, is_available: bool) {
        self.available.store(is_available, Ordering::Relaxed);
    }

    fn next_outcome(&self) -> MockOutcome {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

#[async_trait]
impl FetchProvider for MockProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    async fn fetch_raw(&self, request: &FetchRequest) -> Result<RawFetch, FetchError> {
        let page = |status: u16, content: &str| RawFetch {
            content: content.to_string(),
            status,
            final_url: request.url.to_string(),
            redirect_count: 0,
            extra: HashMap::new(),
        };

        match self.next_outcome() {
            MockOutcome::Success => Ok(page(200, PAGE_BODY)),
            MockOutcome::FailNetwork(message) => Err(FetchError::Network(message)),
            MockOutcome::Status(status) => Ok(page(status, PAGE_BODY)),
            MockOutcome::ShortBody => Ok(page(200, "stub")),
            MockOutcome::Panic => panic!("scripted provider panic"),
            MockOutcome::SlowSuccess(delay) => {
                tokio::time::sleep(delay).await;
                Ok(page(200, PAGE_BODY))
            }
        }
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

/// Sleeper that records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

/// Capabilities helper: zero-cost provider with the given hint
pub fn free_caps(hint: Duration) -> ProviderCapabilities {
    ProviderCapabilities {
        response_time_hint: hint,
        ..Default::default()
    }
}

/// Capabilities helper: billed provider at the given cost
pub fn paid_caps(cost: f64) -> ProviderCapabilities {
    ProviderCapabilities {
        is_commercial: true,
        cost_per_request: cost,
        supports_javascript: true,
        supports_anti_bot_evasion: true,
        ..Default::default()
    }
}
