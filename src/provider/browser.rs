//! Headless-browser automation provider
//!
//! Renders pages through a managed chromiumoxide browser instance, giving the
//! orchestrator a JavaScript-capable backend at zero marginal cost. The
//! browser is expensive to start, so one instance is launched lazily, reused
//! across fetches, health-checked on every acquisition, and relaunched
//! automatically after a crash.
//!
//! The provider owns the browser exclusively; the orchestrator releases it
//! only through `cleanup()`.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use anyhow::{Context, Result};

use super::{
    FetchError, FetchProvider, FetchRequest, ProviderCapabilities, ProviderCore, RawFetch,
};
use crate::utils::constants::DEFAULT_USER_AGENT;

/// Distinguishes user-data directories across relaunches within one process
static LAUNCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Configuration for the headless-browser provider
#[derive(Debug, Clone)]
pub struct BrowserProviderConfig {
    /// Run Chrome headless (headed mode is only useful for debugging)
    pub headless: bool,
    /// Explicit Chrome binary; discovered from well-known paths when unset
    pub chrome_executable: Option<PathBuf>,
    /// Viewport size
    pub window_size: (u32, u32),
    /// Expected response time before any samples exist
    pub response_time_hint: Duration,
    /// Concurrent in-flight page cap; rendering is memory-hungry
    pub max_concurrency: usize,
}

impl Default for BrowserProviderConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            window_size: (1920, 1080),
            response_time_hint: Duration::from_secs(8),
            max_concurrency: 2,
        }
    }
}

/// A launched browser with its event-handler task and profile directory
///
/// The browser sits in an `Arc` so concurrent fetches can share it without
/// holding the handle lock across navigation. The handler task MUST be
/// aborted when the browser goes away, otherwise it runs forever against a
/// dead websocket; Drop handles the fallback path, `shutdown` the orderly
/// one.
struct BrowserHandle {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserHandle {
    /// Orderly shutdown: close, wait for process exit, remove the profile dir
    async fn shutdown(mut self) -> Result<()> {
        let mut errors = Vec::new();

        match Arc::get_mut(&mut self.browser) {
            Some(browser) => {
                if let Err(e) = browser.close().await {
                    errors.push(format!("browser close failed: {e}"));
                }
                // Wait for the process to fully exit so the profile dir is
                // unlocked before removal
                if let Err(e) = browser.wait().await {
                    errors.push(format!("browser wait failed: {e}"));
                }
            }
            None => {
                // In-flight fetches still hold the browser; dropping the Arc
                // kills the Chrome process once they finish
                errors.push("browser still in use, deferring to process kill on drop".to_string());
            }
        }

        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                errors.push(format!(
                    "profile dir cleanup failed for {}: {e}",
                    dir.display()
                ));
            }
        }

        anyhow::ensure!(
            errors.is_empty(),
            "browser shutdown errors: {}",
            errors.join("; ")
        );
        Ok(())
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take() {
            warn!(
                "browser handle dropped without shutdown, removing {}",
                dir.display()
            );
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("failed to remove profile dir {}: {e}", dir.display());
            }
        }
    }
}

/// JavaScript-rendering provider backed by a managed Chrome instance
pub struct BrowserProvider {
    core: ProviderCore,
    config: BrowserProviderConfig,
    handle: Mutex<Option<BrowserHandle>>,
}

impl BrowserProvider {
    /// Build a browser provider with the given registered name
    ///
    /// The browser is NOT launched here; the first fetch pays the launch
    /// cost (a few seconds) and later fetches reuse the instance.
    #[must_use]
    pub fn new(name: impl Into<String>, config: BrowserProviderConfig) -> Self {
        let capabilities = ProviderCapabilities {
            supports_javascript: true,
            supports_anti_bot_evasion: false,
            is_commercial: false,
            cost_per_request: 0.0,
            max_concurrency: config.max_concurrency,
            response_time_hint: config.response_time_hint,
        };

        Self {
            core: ProviderCore::new(name, capabilities),
            config,
            handle: Mutex::new(None),
        }
    }

    /// Get the managed browser, launching or relaunching as needed
    ///
    /// Health-checks an existing instance via a version query; a crashed
    /// browser is shut down and replaced transparently. Returns a shared
    /// handle so the lock is not held across navigation.
    async fn acquire_browser(&self) -> Result<Arc<Browser>, FetchError> {
        let mut guard = self.handle.lock().await;

        if let Some(handle) = guard.as_ref() {
            match handle.browser.version().await {
                Ok(_) => {
                    debug!("browser health check passed, reusing instance");
                    return Ok(Arc::clone(&handle.browser));
                }
                Err(e) => {
                    warn!("browser health check failed ({e}), relaunching");
                    if let Some(crashed) = guard.take() {
                        if let Err(e) = crashed.shutdown().await {
                            warn!("crashed browser cleanup: {e}");
                        }
                    }
                }
            }
        }

        let handle = launch_browser(&self.config)
            .await
            .map_err(|e| FetchError::Browser(format!("{e:#}")))?;
        let browser = Arc::clone(&handle.browser);
        *guard = Some(handle);
        Ok(browser)
    }
}

#[async_trait]
impl FetchProvider for BrowserProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    async fn fetch_raw(&self, request: &FetchRequest) -> Result<RawFetch, FetchError> {
        let browser = self.acquire_browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Browser(format!("failed to open page: {e}")))?;

        if let Some(agent) = &request.user_agent {
            page.set_user_agent(agent.as_str())
                .await
                .map_err(|e| FetchError::Browser(format!("failed to set user agent: {e}")))?;
        }

        let navigation = async {
            page.goto(request.url.as_str())
                .await
                .map_err(|e| FetchError::Browser(format!("navigation failed: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| FetchError::Browser(format!("page load failed: {e}")))?;

            let content = page
                .content()
                .await
                .map_err(|e| FetchError::Browser(format!("failed to read DOM: {e}")))?;
            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| request.url.to_string());

            Ok::<_, FetchError>((content, final_url))
        };
        let outcome = navigation.await;

        // Close the tab regardless of outcome to keep the instance lean
        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }

        let (content, final_url) = outcome?;

        let mut extra = HashMap::new();
        extra.insert(
            "renderer".to_string(),
            serde_json::Value::String("chromiumoxide".to_string()),
        );

        // CDP resolves content only for committed loads; navigation errors
        // surface above, so a rendered document is reported as a 200.
        Ok(RawFetch {
            content,
            status: 200,
            final_url,
            redirect_count: 0,
            extra,
        })
    }

    async fn is_available(&self) -> bool {
        let guard = self.handle.lock().await;
        if let Some(handle) = guard.as_ref() {
            return handle.browser.version().await.is_ok();
        }
        drop(guard);

        // No instance yet: availability means a binary we could launch
        self.config.chrome_executable.is_some() || find_chrome_executable().is_some()
    }

    async fn cleanup(&self) -> Result<()> {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.take() {
            info!(provider = self.name(), "shutting down managed browser");
            handle.shutdown().await?;
        }
        Ok(())
    }
}

/// Launch a Chrome instance with a fresh profile directory
///
/// The event handler is spawned on a tracked task so it can be aborted when
/// the handle goes away.
async fn launch_browser(config: &BrowserProviderConfig) -> Result<BrowserHandle> {
    let chrome_path = match &config.chrome_executable {
        Some(path) => path.clone(),
        None => find_chrome_executable().context("no Chrome/Chromium executable found")?,
    };

    let seq = LAUNCH_SEQ.fetch_add(1, Ordering::Relaxed);
    let user_data_dir =
        std::env::temp_dir().join(format!("scrapeflow_chrome_{}_{seq}", std::process::id()));
    std::fs::create_dir_all(&user_data_dir).context("failed to create user data directory")?;

    let (width, height) = config.window_size;
    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(width, height)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .arg(format!("--user-agent={DEFAULT_USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--mute-audio")
        .arg("--hide-scrollbars");
    if config.headless {
        builder = builder.headless_mode(HeadlessMode::default());
    } else {
        builder = builder.with_head();
    }
    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    info!(
        "launching managed browser (profile {})",
        user_data_dir.display()
    );
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;

    let handler_task = tokio::task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::error!("browser handler error: {e:?}");
            }
        }
        debug!("browser event handler task completed");
    });

    Ok(BrowserHandle {
        browser: Arc::new(browser),
        handler: handler_task,
        user_data_dir: Some(user_data_dir),
    })
}

/// Locate a Chrome/Chromium binary from the environment or well-known paths
///
/// `CHROMIUM_PATH` overrides discovery.
fn find_chrome_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    candidates.iter().map(PathBuf::from).find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_capabilities_advertise_javascript_at_zero_cost() {
        let provider = BrowserProvider::new("browser", BrowserProviderConfig::default());
        let caps = provider.capabilities();
        assert!(caps.supports_javascript);
        assert!(!caps.is_commercial);
        assert_eq!(caps.cost_per_request, 0.0);
    }

    #[test]
    fn construction_does_not_launch_a_browser() {
        let provider = BrowserProvider::new("browser", BrowserProviderConfig::default());
        assert!(provider.handle.try_lock().expect("uncontended").is_none());
    }

    #[tokio::test]
    async fn cleanup_without_a_browser_is_a_no_op() {
        let provider = BrowserProvider::new("browser", BrowserProviderConfig::default());
        provider.cleanup().await.expect("idle cleanup succeeds");
    }
}
