//! Eligibility filtering, health exclusion, and monitoring snapshots

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockOutcome, MockProvider, RecordingSleeper, free_caps, paid_caps};
use scrapeflow::{
    OrchestratorConfig, ProviderManager, RequiredCapabilities, ScrapeError, ScrapeOptions,
};

const URL: &str = "https://target.example.com/page";

fn test_manager(config: OrchestratorConfig) -> ProviderManager {
    ProviderManager::with_sleeper(config, Arc::new(RecordingSleeper::default()))
}

#[tokio::test]
async fn malformed_urls_fail_before_any_provider_is_touched() {
    let manager = test_manager(OrchestratorConfig::default());
    manager.register(Arc::new(MockProvider::new("untouched"))).await;

    let err = manager
        .scrape("not a url at all", ScrapeOptions::default())
        .await
        .expect_err("malformed url");
    assert!(matches!(err, ScrapeError::InvalidUrl { .. }));

    let err = manager
        .scrape("ftp://example.com/file", ScrapeOptions::default())
        .await
        .expect_err("non-http scheme");
    assert!(matches!(err, ScrapeError::InvalidUrl { .. }));

    assert_eq!(manager.metrics().await["untouched"].request_count, 0);
}

#[tokio::test]
async fn empty_registry_is_a_configuration_error() {
    let manager = test_manager(OrchestratorConfig::default());

    let err = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect_err("nothing registered");
    assert!(matches!(err, ScrapeError::NoSuitableProviders(_)));
}

#[tokio::test]
async fn unmatched_capability_requirements_are_not_a_transient_failure() {
    let manager = test_manager(OrchestratorConfig::default());
    manager
        .register(Arc::new(MockProvider::with_capabilities(
            "plain",
            free_caps(Duration::from_secs(1)),
        )))
        .await;

    let options = ScrapeOptions::default().with_required_capabilities(RequiredCapabilities {
        javascript: true,
        anti_bot_evasion: true,
    });
    let err = manager
        .scrape(URL, options)
        .await
        .expect_err("no provider renders javascript");

    // Distinct from AllProvidersFailed: no candidate was even eligible
    assert!(matches!(err, ScrapeError::NoSuitableProviders(_)));
    assert_eq!(manager.metrics().await["plain"].request_count, 0);
}

#[tokio::test]
async fn allow_list_restricts_the_candidate_set() {
    let config = OrchestratorConfig::default().with_enabled_providers(["second"]);
    let manager = test_manager(config);
    manager.register(Arc::new(MockProvider::new("first"))).await;
    manager.register(Arc::new(MockProvider::new("second"))).await;

    let result = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("allowed provider succeeds");
    assert_eq!(result.provider_used, "second");
    assert_eq!(manager.metrics().await["first"].request_count, 0);
}

#[tokio::test]
async fn allow_list_naming_no_registered_provider_yields_no_candidates() {
    let config = OrchestratorConfig::default().with_enabled_providers(["phantom"]);
    let manager = test_manager(config);
    manager.register(Arc::new(MockProvider::new("real"))).await;

    let err = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect_err("allow-list excludes everything");
    assert!(matches!(err, ScrapeError::NoSuitableProviders(_)));
}

#[tokio::test]
async fn unhealthy_providers_are_skipped_for_the_current_call_only() {
    // Cost-optimized ties resolve to registration order, so a healthy
    // "wobbly" would be ranked first
    let config = OrchestratorConfig::default()
        .with_strategy(scrapeflow::SelectionStrategy::CostOptimized);
    let manager = test_manager(config);
    let wobbly = Arc::new(MockProvider::new("wobbly").available(false));
    manager.register(wobbly.clone()).await;
    manager.register(Arc::new(MockProvider::new("stable"))).await;

    let result = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("stable succeeds");
    assert_eq!(result.provider_used, "stable");
    assert_eq!(manager.metrics().await["wobbly"].request_count, 0);

    // Recovery is picked up on the very next call; exclusion is not sticky
    wobbly.set_available(true);
    let result = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("recovered provider is back in rotation");
    assert_eq!(result.provider_used, "wobbly");
}

#[tokio::test]
async fn health_exclusion_is_waived_when_every_candidate_probes_unhealthy() {
    let manager = test_manager(OrchestratorConfig::default());
    manager
        .register(Arc::new(MockProvider::new("gloomy").available(false)))
        .await;
    manager
        .register(Arc::new(
            MockProvider::new("gloomier")
                .available(false)
                .default_outcome(MockOutcome::FailNetwork("really down".to_string())),
        ))
        .await;

    // Probes are advisory: with nothing healthy, attempt everything
    let result = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("first provider works despite its pessimistic probe");
    assert_eq!(result.provider_used, "gloomy");
}

#[tokio::test]
async fn providers_health_reports_every_registered_backend() {
    let manager = test_manager(OrchestratorConfig::default());
    manager.register(Arc::new(MockProvider::new("up"))).await;
    manager
        .register(Arc::new(MockProvider::new("down").available(false)))
        .await;

    let verdicts = manager.providers_health().await;
    assert_eq!(verdicts.len(), 2);

    let up = verdicts
        .iter()
        .find(|(name, _)| name == "up")
        .expect("up is reported");
    assert!(up.1.is_healthy);

    let down = verdicts
        .iter()
        .find(|(name, _)| name == "down")
        .expect("down is reported");
    assert!(!down.1.is_healthy);
    assert!(down.1.message.contains("unavailable"));
}

#[tokio::test]
async fn metrics_snapshots_are_idempotent() {
    let manager = test_manager(OrchestratorConfig::default());
    manager.register(Arc::new(MockProvider::new("a"))).await;
    manager
        .register(Arc::new(MockProvider::with_capabilities("b", paid_caps(0.02))))
        .await;

    manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("succeeds");

    assert_eq!(manager.metrics().await, manager.metrics().await);
}

#[tokio::test]
async fn re_registering_a_name_replaces_the_provider_in_place() {
    let manager = test_manager(OrchestratorConfig::default());
    manager
        .register(Arc::new(
            MockProvider::new("relay")
                .default_outcome(MockOutcome::FailNetwork("old endpoint".to_string())),
        ))
        .await;
    manager.register(Arc::new(MockProvider::new("other"))).await;

    // Replacement keeps the original registration position
    manager.register(Arc::new(MockProvider::new("relay"))).await;

    let result = manager
        .scrape(URL, ScrapeOptions::default())
        .await
        .expect("replacement succeeds");
    assert_eq!(result.provider_used, "relay");
    assert_eq!(manager.metrics().await.len(), 2);
}
