//! [`PageSource`] over the DevTools protocol.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tablewatch_protocols::{EngineKind, PageSource, SessionError};
use tracing::{debug, error, info, warn};

use crate::cdp::{CdpClient, CdpError, PageSession};
use crate::launcher::{LaunchOptions, LaunchedBrowser};

/// Settings for a [`CdpPageSource`].
#[derive(Debug, Clone)]
pub struct CdpSourceConfig {
    pub url: String,
    pub launch: LaunchOptions,
    /// Attach to this debugging endpoint instead of launching a browser.
    pub remote_endpoint: Option<String>,
    pub navigation_attempts: u32,
    pub navigation_backoff: Duration,
    /// Per-attempt page load deadline.
    pub load_timeout: Duration,
    /// Deadline for any single protocol command and discovery request.
    pub command_timeout: Duration,
    /// How long closing an old tab or browser may take before it is
    /// abandoned (or killed, if we launched it).
    pub teardown_timeout: Duration,
    /// Text of the link that dismisses the interstitial; `None` skips it.
    pub popup_link_text: Option<String>,
    /// Where to save a screenshot when the interstitial can't be dismissed.
    pub screenshot_dir: Option<PathBuf>,
}

impl CdpSourceConfig {
    pub fn new(kind: EngineKind, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            launch: LaunchOptions::new(kind),
            remote_endpoint: None,
            navigation_attempts: 10,
            navigation_backoff: Duration::from_secs(2),
            load_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            teardown_timeout: Duration::from_secs(3),
            popup_link_text: Some("Continue".to_string()),
            screenshot_dir: None,
        }
    }
}

/// One live browser session. Replaced wholesale on refresh.
struct LiveSession {
    client: CdpClient,
    page: PageSession,
    browser: Option<LaunchedBrowser>,
    started: Instant,
}

/// Browser-backed page source.
pub struct CdpPageSource {
    config: CdpSourceConfig,
    live: Option<LiveSession>,
}

impl CdpPageSource {
    pub fn new(config: CdpSourceConfig) -> Self {
        Self { config, live: None }
    }

    /// Start or attach to a browser, open a tab and load the page.
    async fn start(&self) -> Result<LiveSession, SessionError> {
        let (endpoint, browser) = match &self.config.remote_endpoint {
            Some(remote) => {
                info!(endpoint = %remote, "Attaching to running browser");
                (remote.clone(), None)
            }
            None => {
                let browser = LaunchedBrowser::launch(&self.config.launch)
                    .await
                    .map_err(|e| SessionError::EngineStart(e.to_string()))?;
                (browser.endpoint().to_string(), Some(browser))
            }
        };

        match self.open(&endpoint).await {
            Ok((client, page)) => Ok(LiveSession {
                client,
                page,
                browser,
                started: Instant::now(),
            }),
            Err(e) => {
                if let Some(browser) = browser {
                    browser.terminate(Duration::ZERO).await;
                }
                Err(e)
            }
        }
    }

    async fn open(&self, endpoint: &str) -> Result<(CdpClient, PageSession), SessionError> {
        let client = CdpClient::connect(endpoint, self.config.command_timeout)
            .await
            .map_err(|e| SessionError::EngineStart(e.to_string()))?;
        let page = client
            .new_page()
            .await
            .map_err(|e| SessionError::EngineStart(e.to_string()))?;

        if let Err(e) = self.configure(&page).await {
            warn!(error = %e, "Could not apply page settings");
        }

        if let Err(e) = self.navigate(&page).await {
            if let Err(close) = client.close_page(page.target_id()).await {
                debug!(error = %close, "Closing tab after failed navigation");
            }
            return Err(e);
        }

        self.dismiss_popup(&page).await;
        Ok((client, page))
    }

    async fn configure(&self, page: &PageSession) -> Result<(), CdpError> {
        if let Some(ua) = &self.config.launch.user_agent {
            page.set_user_agent(ua).await?;
        }
        page.set_window_size(self.config.launch.window_width, self.config.launch.window_height)
            .await
    }

    async fn navigate(&self, page: &PageSession) -> Result<(), SessionError> {
        let attempts = self.config.navigation_attempts.max(1);
        for attempt in 1..=attempts {
            info!(url = %self.config.url, attempt, "Loading webpage");
            match page.navigate(&self.config.url, self.config.load_timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    error!(attempt, error = %e, "Page load failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.navigation_backoff).await;
                    }
                }
            }
        }
        error!(attempts, "Page load retry limit exceeded");
        Err(SessionError::NavigationExhausted {
            url: self.config.url.clone(),
            attempts,
        })
    }

    /// Click the interstitial's dismiss link. Failure is logged only.
    async fn dismiss_popup(&self, page: &PageSession) {
        let Some(text) = self
            .config
            .popup_link_text
            .as_deref()
            .filter(|t| !t.is_empty())
        else {
            return;
        };

        match page.evaluate(&popup_script(text)).await {
            Ok(Value::Bool(true)) => {
                debug!(link = text, "Popup dismissed");
                if let Err(e) = page.wait_for_load(self.config.load_timeout).await {
                    debug!(error = %e, "Page still loading after popup click");
                }
            }
            Ok(_) => {
                error!(link = text, "Can't close the popup: link not found");
                self.save_screenshot(page).await;
            }
            Err(e) => {
                error!(link = text, error = %e, "Can't close the popup");
                self.save_screenshot(page).await;
            }
        }
    }

    async fn save_screenshot(&self, page: &PageSession) {
        let Some(dir) = &self.config.screenshot_dir else {
            return;
        };
        let path = dir.join(format!("{}.png", uuid::Uuid::new_v4()));

        let result = async {
            let data = page.screenshot_png().await?;
            let bytes = BASE64
                .decode(data)
                .map_err(|e| CdpError::InvalidResponse(e.to_string()))?;
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, bytes).await?;
            Ok::<_, CdpError>(())
        }
        .await;

        match result {
            Ok(()) => error!(path = %path.display(), "Screenshot saved"),
            Err(e) => warn!(error = %e, "Screenshot failed"),
        }
    }

    async fn read(live: &LiveSession) -> Result<String, CdpError> {
        if live.client.is_closed() || !live.client.has_target(live.page.target_id()).await? {
            return Err(CdpError::SessionClosed);
        }
        live.page.get_content().await
    }

    /// Close the tab and, if we launched it, the browser. Never fails and
    /// never waits on a hung browser longer than `limit`.
    async fn teardown(live: LiveSession, limit: Duration) {
        const EXIT_GRACE: Duration = Duration::from_secs(5);

        match live.browser {
            Some(browser) => {
                let grace = if live.client.is_closed() {
                    Duration::ZERO
                } else {
                    match tokio::time::timeout(limit, live.client.close_browser()).await {
                        Ok(Ok(())) => EXIT_GRACE,
                        Ok(Err(e)) => {
                            debug!(error = %e, "Browser.close failed");
                            EXIT_GRACE
                        }
                        Err(_) => {
                            warn!(?limit, "Browser.close unanswered, killing browser");
                            Duration::ZERO
                        }
                    }
                };
                drop(live.client);
                browser.terminate(grace).await;
            }
            None => {
                if live.client.is_closed() {
                    return;
                }
                match tokio::time::timeout(limit, live.client.close_page(live.page.target_id())).await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "Closing tab failed"),
                    Err(_) => warn!(?limit, "Closing tab unanswered, abandoning it"),
                }
            }
        }
    }
}

/// Script that clicks the first link containing `text`; evaluates to
/// whether one was found.
fn popup_script(text: &str) -> String {
    let needle = Value::String(text.to_string());
    format!(
        "(() => {{ const link = Array.from(document.querySelectorAll('a')).find(a => (a.textContent || '').includes({})); if (!link) return false; link.click(); return true; }})()",
        needle
    )
}

/// Map a failed read to the session taxonomy.
fn read_error(e: CdpError, deadline: Duration) -> SessionError {
    if e.is_target_gone() {
        SessionError::WindowLost(e.to_string())
    } else if matches!(e, CdpError::Timeout(_)) {
        SessionError::Timeout(deadline)
    } else {
        SessionError::Transport(e.to_string())
    }
}

#[async_trait]
impl PageSource for CdpPageSource {
    fn kind(&self) -> EngineKind {
        self.config.launch.kind
    }

    async fn acquire(&mut self) -> Result<(), SessionError> {
        if let Some(old) = self.live.take() {
            Self::teardown(old, self.config.teardown_timeout).await;
        }
        let live = self.start().await?;
        info!(kind = %self.kind(), "Browser session ready");
        self.live = Some(live);
        Ok(())
    }

    async fn read_content(&mut self, timeout: Duration) -> Result<String, SessionError> {
        let live = self.live.as_ref().ok_or(SessionError::Closed)?;
        match tokio::time::timeout(timeout, Self::read(live)).await {
            Ok(Ok(markup)) => Ok(markup),
            Ok(Err(e)) => Err(read_error(e, timeout)),
            Err(_) => Err(SessionError::Timeout(timeout)),
        }
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        info!("Refreshing browser session");
        self.acquire().await
    }

    fn age(&self) -> Duration {
        self.live
            .as_ref()
            .map_or(Duration::ZERO, |live| live.started.elapsed())
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        if let Some(live) = self.live.take() {
            info!("Closing browser session");
            Self::teardown(live, self.config.teardown_timeout).await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
