//! Browser session lifecycle management
//!
//! One browser process and one page are shared by every tool call in the
//! process. Automation tools operate on "the current page"; recreating a page
//! per call would break multi-step flows (navigate, then click, then type).
//! [`Session::acquire`] either reuses the live page or relaunches the browser,
//! and serializes concurrent initialization attempts so only one browser
//! process ever starts.

use crate::error::{Result, SessionError};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Default desktop user agent presented to pages
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1280)
    pub width: u32,
    /// Browser window height (default: 800)
    pub height: u32,
    /// Enable sandbox (default: true for production)
    pub sandbox: bool,
    /// User agent string
    pub user_agent: String,
    /// Navigation timeout in milliseconds (default: 30000)
    pub nav_timeout_ms: u64,
    /// Upper bound on a single acquire, including launch (default: 30000)
    pub init_timeout_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Directory screenshots are written to (default: "screenshots")
    pub screenshot_dir: std::path::PathBuf,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1280,
            height: 800,
            sandbox: true,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            nav_timeout_ms: 30000,
            init_timeout_ms: 30000,
            chrome_path: None,
            screenshot_dir: std::path::PathBuf::from("screenshots"),
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Set navigation timeout
    pub fn nav_timeout_ms(mut self, ms: u64) -> Self {
        self.config.nav_timeout_ms = ms;
        self
    }

    /// Set the acquire/initialization timeout
    pub fn init_timeout_ms(mut self, ms: u64) -> Self {
        self.config.init_timeout_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the screenshot artifact directory
    pub fn screenshot_dir<P: Into<std::path::PathBuf>>(mut self, dir: P) -> Self {
        self.config.screenshot_dir = dir.into();
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Live handles owned by the session while a browser is up.
///
/// Invariant: callers never observe this struct partially populated. It is
/// constructed fully or not at all, and swapped into the session state in one
/// write.
struct Handles {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    diagnostics_task: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

struct SessionInner {
    config: BrowserConfig,
    /// Serializes initialization and teardown. Concurrent acquirers await
    /// this lock instead of polling an "initializing" flag.
    init_lock: Mutex<()>,
    state: RwLock<Option<Handles>>,
}

/// Process-wide browser session: the shared browser/page pair plus its
/// initialization guard.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Outcome of one teardown step in [`Session::release`]
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Step name ("page", "browser", "tasks")
    pub step: &'static str,
    /// Whether the step completed without error
    pub ok: bool,
    /// Error detail for failed steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated result of a [`Session::release`] call.
///
/// Teardown is best-effort: every step runs regardless of earlier failures,
/// and the per-step outcomes are reported here instead of only logged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseReport {
    /// Whether a browser was open when release was called
    pub was_open: bool,
    /// Per-step outcomes, in execution order
    pub steps: Vec<StepOutcome>,
}

impl ReleaseReport {
    fn record(&mut self, step: &'static str, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => self.steps.push(StepOutcome {
                step,
                ok: true,
                detail: None,
            }),
            Err(detail) => self.steps.push(StepOutcome {
                step,
                ok: false,
                detail: Some(detail),
            }),
        }
    }

    /// True if every teardown step completed cleanly
    pub fn all_ok(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    /// One-line rendering, e.g. `page: ok, browser: ok, tasks: ok`
    pub fn summary(&self) -> String {
        if !self.was_open {
            return "browser was not open".to_string();
        }
        self.steps
            .iter()
            .map(|s| {
                if s.ok {
                    format!("{}: ok", s.step)
                } else {
                    format!("{}: failed", s.step)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Snapshot of the session state for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Whether a browser is currently open
    pub open: bool,
    /// Whether the CDP connection is still alive
    pub connected: bool,
    /// Current page URL, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Session {
    /// Create a session. No browser is launched until the first acquire.
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                init_lock: Mutex::new(()),
                state: RwLock::new(None),
            }),
        }
    }

    /// Browser configuration for this session
    pub fn config(&self) -> &BrowserConfig {
        &self.inner.config
    }

    /// Get the current page, launching or relaunching the browser as needed.
    ///
    /// Reuses the existing page when the browser is still connected. The
    /// whole call, launch included, is bounded by `init_timeout_ms`; on
    /// expiry it fails with [`SessionError::InitTimeout`] instead of waiting
    /// forever behind a stuck initializer.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Page> {
        let timeout_ms = self.inner.config.init_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.acquire_inner()).await
        {
            Ok(result) => result,
            Err(_) => Err(SessionError::InitTimeout(timeout_ms).into()),
        }
    }

    async fn acquire_inner(&self) -> Result<Page> {
        let _guard = self.inner.init_lock.lock().await;

        {
            let state = self.inner.state.read().await;
            if let Some(handles) = state.as_ref() {
                if handles.connected.load(Ordering::SeqCst) {
                    debug!("Reusing existing browser page");
                    return Ok(handles.page.clone());
                }
                warn!("Browser connection lost, relaunching");
            }
        }

        // Stale or absent: tear down whatever is left, then launch fresh.
        // A launch failure leaves the state empty and propagates.
        self.close_stale().await;
        let handles = Self::launch(&self.inner.config).await?;
        let page = handles.page.clone();
        *self.inner.state.write().await = Some(handles);
        Ok(page)
    }

    /// Best-effort close of a dead or half-dead browser. Errors are swallowed;
    /// the state is left empty either way.
    async fn close_stale(&self) {
        let taken = self.inner.state.write().await.take();
        if let Some(mut handles) = taken {
            if let Err(e) = handles.browser.close().await {
                warn!("Closing stale browser failed: {}", e);
            }
            handles.handler_task.abort();
            handles.diagnostics_task.abort();
        }
    }

    async fn launch(config: &BrowserConfig) -> Result<Handles> {
        info!(headless = config.headless, "Launching browser");

        let mut builder = CdpBrowserConfig::builder();

        builder = builder.viewport(chromiumoxide::handler::viewport::Viewport {
            width: config.width,
            height: config.height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.arg("--no-sandbox");
        }

        builder = builder.arg(format!("--user-agent={}", config.user_agent));

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in &config.extra_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| SessionError::ConfigError(e.to_string()))?;

        let (mut browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| SessionError::LaunchFailed(e.to_string()))?;

        // The handler task drives the CDP event stream. When it ends the
        // websocket is gone and the next acquire must relaunch.
        let connected = Arc::new(AtomicBool::new(true));
        let connected_flag = connected.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            connected_flag.store(false, Ordering::SeqCst);
            debug!("Browser handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(SessionError::PageCreationFailed(e.to_string()).into());
            }
        };

        let diagnostics_task = Self::spawn_diagnostics(&page).await;

        info!("Browser launched");

        Ok(Handles {
            browser,
            page,
            handler_task,
            diagnostics_task,
            connected,
        })
    }

    /// Forward page console messages and uncaught exceptions into the logs.
    async fn spawn_diagnostics(page: &Page) -> JoinHandle<()> {
        let console = page.event_listener::<EventConsoleApiCalled>().await.ok();
        let exceptions = page.event_listener::<EventExceptionThrown>().await.ok();

        tokio::spawn(async move {
            match (console, exceptions) {
                (Some(mut console), Some(mut exceptions)) => loop {
                    tokio::select! {
                        event = console.next() => match event {
                            Some(event) => debug!(kind = ?event.r#type, "Page console"),
                            None => break,
                        },
                        event = exceptions.next() => match event {
                            Some(event) => {
                                warn!(error = %event.exception_details.text, "Page exception")
                            }
                            None => break,
                        },
                    }
                },
                _ => debug!("Page diagnostics listeners unavailable"),
            }
        })
    }

    /// Tear down the session: close the page, then the browser, then abort
    /// the background tasks. Each step is independently guarded so an earlier
    /// failure never prevents a later step from running, and every outcome is
    /// reported. The state is always empty afterwards.
    #[instrument(skip(self))]
    pub async fn release(&self) -> ReleaseReport {
        let _guard = self.inner.init_lock.lock().await;
        let taken = self.inner.state.write().await.take();

        let mut report = ReleaseReport::default();
        let Some(mut handles) = taken else {
            debug!("Release called with no open browser");
            return report;
        };
        report.was_open = true;

        report.record(
            "page",
            handles
                .page
                .close()
                .await
                .map_err(|e| e.to_string())
                .map(|_| ()),
        );

        report.record(
            "browser",
            handles
                .browser
                .close()
                .await
                .map_err(|e| e.to_string())
                .map(|_| ()),
        );

        handles.handler_task.abort();
        handles.diagnostics_task.abort();
        report.record("tasks", Ok(()));

        info!(summary = %report.summary(), "Browser released");
        report
    }

    /// Report whether a browser is open and reachable, without launching one.
    pub async fn status(&self) -> SessionStatus {
        let state = self.inner.state.read().await;
        match state.as_ref() {
            Some(handles) => {
                let connected = handles.connected.load(Ordering::SeqCst);
                let url = if connected {
                    handles.page.url().await.ok().flatten()
                } else {
                    None
                };
                SessionStatus {
                    open: true,
                    connected,
                    url,
                }
            }
            None => SessionStatus {
                open: false,
                connected: false,
                url: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_config_default() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 800);
        assert!(config.sandbox);
        assert_eq!(config.nav_timeout_ms, 30000);
        assert_eq!(config.init_timeout_ms, 30000);
        assert!(config.user_agent.contains("Chrome"));
    }

    #[test]
    fn test_browser_config_builder() {
        let config = BrowserConfig::builder()
            .headless(false)
            .viewport(1920, 1080)
            .sandbox(false)
            .user_agent("TestBot/1.0")
            .nav_timeout_ms(60000)
            .init_timeout_ms(10000)
            .screenshot_dir("/tmp/shots")
            .arg("--disable-gpu")
            .build();

        assert!(!config.headless);
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert!(!config.sandbox);
        assert_eq!(config.user_agent, "TestBot/1.0");
        assert_eq!(config.nav_timeout_ms, 60000);
        assert_eq!(config.init_timeout_ms, 10000);
        assert_eq!(config.screenshot_dir, std::path::PathBuf::from("/tmp/shots"));
        assert_eq!(config.extra_args, vec!["--disable-gpu"]);
    }

    #[test]
    fn test_release_report_summary_empty() {
        let report = ReleaseReport::default();
        assert!(!report.was_open);
        assert!(report.all_ok());
        assert_eq!(report.summary(), "browser was not open");
    }

    #[test]
    fn test_release_report_aggregates_failures() {
        let mut report = ReleaseReport {
            was_open: true,
            steps: Vec::new(),
        };
        report.record("page", Err("target gone".to_string()));
        report.record("browser", Ok(()));
        report.record("tasks", Ok(()));

        assert!(!report.all_ok());
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.summary(), "page: failed, browser: ok, tasks: ok");
        assert_eq!(report.steps[0].detail.as_deref(), Some("target gone"));
    }

    #[test]
    fn test_status_without_browser() {
        let session = Session::new(BrowserConfig::default());
        let status = tokio_test::block_on(session.status());
        assert!(!status.open);
        assert!(!status.connected);
        assert!(status.url.is_none());
    }

    #[test]
    fn test_release_without_browser_is_noop() {
        let session = Session::new(BrowserConfig::default());
        let report = tokio_test::block_on(session.release());
        assert!(!report.was_open);
        assert!(report.steps.is_empty());
    }
}
