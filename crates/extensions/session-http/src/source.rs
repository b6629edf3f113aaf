//! [`PageSource`] over plain HTTP, for tables rendered server-side.
//!
//! Each read is one GET of the configured URL; "refresh" rebuilds the
//! client and reloads the page.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tablewatch_protocols::{EngineKind, PageSource, SessionError};
use tracing::{debug, error, info};

/// Settings for an [`HttpPageSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub url: String,
    pub user_agent: Option<String>,
    pub navigation_attempts: u32,
    pub navigation_backoff: Duration,
    /// Deadline for the initial load during acquire.
    pub load_timeout: Duration,
}

impl HttpSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: None,
            navigation_attempts: 10,
            navigation_backoff: Duration::from_secs(2),
            load_timeout: Duration::from_secs(30),
        }
    }
}

struct Session {
    client: Client,
    started: Instant,
}

/// Page source that GETs the URL each cycle.
pub struct HttpPageSource {
    config: HttpSourceConfig,
    session: Option<Session>,
}

impl HttpPageSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    fn build_client(&self) -> Result<Client, SessionError> {
        let mut builder = Client::builder();
        if let Some(ua) = &self.config.user_agent {
            builder = builder.user_agent(ua.as_str());
        }
        builder
            .build()
            .map_err(|e| SessionError::EngineStart(e.to_string()))
    }

    async fn navigate(&self, client: &Client) -> Result<(), SessionError> {
        let attempts = self.config.navigation_attempts.max(1);
        for attempt in 1..=attempts {
            info!(url = %self.config.url, attempt, "Loading webpage");
            match fetch(client, &self.config.url, self.config.load_timeout).await {
                Ok(_) => return Ok(()),
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
}

async fn fetch(client: &Client, url: &str, timeout: Duration) -> Result<String, reqwest::Error> {
    client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Map a failed fetch to the session taxonomy. Unreachable hosts, server
/// errors and broken bodies count as a lost window so the caller refreshes;
/// client errors are fatal.
fn read_error(e: reqwest::Error, deadline: Duration) -> SessionError {
    let server_error = e.status().is_some_and(|status| status.is_server_error());
    if e.is_timeout() {
        SessionError::Timeout(deadline)
    } else if e.is_connect() || e.is_body() || e.is_decode() || server_error {
        SessionError::WindowLost(e.to_string())
    } else {
        SessionError::Transport(e.to_string())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn kind(&self) -> EngineKind {
        EngineKind::Http
    }

    async fn acquire(&mut self) -> Result<(), SessionError> {
        url::Url::parse(&self.config.url)
            .map_err(|e| SessionError::EngineStart(format!("{}: {}", self.config.url, e)))?;
        self.session = None;

        let client = self.build_client()?;
        self.navigate(&client).await?;
        self.session = Some(Session {
            client,
            started: Instant::now(),
        });
        debug!("HTTP session ready");
        Ok(())
    }

    async fn read_content(&mut self, timeout: Duration) -> Result<String, SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::Closed)?;
        fetch(&session.client, &self.config.url, timeout)
            .await
            .map_err(|e| read_error(e, timeout))
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        info!("Refreshing HTTP session");
        self.acquire().await
    }

    fn age(&self) -> Duration {
        self.session
            .as_ref()
            .map_or(Duration::ZERO, |s| s.started.elapsed())
    }

    async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.session = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
