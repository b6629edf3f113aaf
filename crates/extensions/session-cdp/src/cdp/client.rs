//! CDP browser-level client.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tracing::debug;

use super::error::CdpError;
use super::protocol::{NewTarget, TargetInfo, VersionInfo};
use super::session::PageSession;
use super::transport::Transport;

/// Browser connection.
///
/// Connects to the browser-level WebSocket advertised by the debugging
/// endpoint's `/json/version` and multiplexes page sessions over it.
pub struct CdpClient {
    /// HTTP endpoint for page discovery.
    http_endpoint: String,
    /// Discovery client; requests share the command deadline.
    http: reqwest::Client,
    transport: Arc<Transport>,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to the browser at `endpoint` (e.g. `http://127.0.0.1:9222`).
    pub async fn connect(endpoint: &str, command_timeout: Duration) -> Result<Self, CdpError> {
        let http_endpoint = url::Url::parse(endpoint)?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(command_timeout)
            .build()?;

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: VersionInfo = http
            .get(&version_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| CdpError::EndpointUnavailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::EndpointUnavailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let transport = Arc::new(Transport::new(ws_sink, command_timeout));
        let recv_task = tokio::spawn(transport.clone().receive_loop(ws_source));

        debug!("CDP client connected to {}", version.ws_url);

        Ok(Self {
            http_endpoint,
            http,
            transport,
            _recv_task: recv_task,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.http_endpoint
    }

    /// Whether the browser socket has gone away.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Open a new blank tab and attach a session to it.
    pub async fn new_page(&self) -> Result<PageSession, CdpError> {
        // Chrome requires PUT for /json/new
        let create_url = format!("{}/json/new?about:blank", self.http_endpoint);
        let target: NewTarget = self
            .http
            .put(&create_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(target = %target.id, kind = %target.kind, "Created tab");

        let result = self
            .transport
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target.id,
                    "flatten": true
                })),
                None,
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(target.id, session_id, self.transport.clone());
        session.enable_domains().await?;
        Ok(session)
    }

    /// Get all targets.
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.transport.call("Target.getTargets", None, None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Whether `target_id` is still an open page.
    pub async fn has_target(&self, target_id: &str) -> Result<bool, CdpError> {
        Ok(self
            .get_targets()
            .await?
            .iter()
            .any(|t| t.is_page() && t.target_id == target_id))
    }

    /// Close a page/target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.transport
            .call(
                "Target.closeTarget",
                Some(json!({"targetId": target_id})),
                None,
            )
            .await?;
        Ok(())
    }

    /// Ask the browser process to exit.
    pub async fn close_browser(&self) -> Result<(), CdpError> {
        self.transport.call("Browser.close", None, None).await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}
