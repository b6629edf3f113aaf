//! Request/response correlation over the shared browser WebSocket.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::error::CdpError;
use super::protocol::{Command, Incoming};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

type Pending = Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>;

pub(crate) struct Transport {
    ws_tx: tokio::sync::Mutex<WsSink>,
    pending: Pending,
    next_id: AtomicU64,
    closed: AtomicBool,
    command_timeout: Duration,
}

/// Removes a pending entry when its caller stops waiting.
struct PendingGuard<'a> {
    pending: &'a Pending,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl Transport {
    pub(crate) fn new(ws_tx: WsSink, command_timeout: Duration) -> Self {
        Self {
            ws_tx: tokio::sync::Mutex::new(ws_tx),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            command_timeout,
        }
    }

    /// Send a command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CdpError::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&Command {
            id,
            method,
            params,
            session_id,
        })?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => Err(CdpError::Timeout(format!("Request {} timed out", method))),
        }
    }

    fn dispatch(&self, incoming: Incoming) {
        let Some(id) = incoming.id else {
            if let Some(method) = &incoming.method {
                trace!(%method, "CDP event ignored");
            }
            return;
        };

        let Some(tx) = self.pending.lock().remove(&id) else {
            return;
        };
        let result = incoming.into_result().map_err(|e| CdpError::Protocol {
            code: e.code,
            message: e.message,
        });
        let _ = tx.send(result);
    }

    /// Fail every waiting caller and refuse new calls.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for (_, tx) in self.pending.lock().drain() {
            let _ = tx.send(Err(CdpError::SessionClosed));
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Read responses until the socket ends, then close the transport.
    pub(crate) async fn receive_loop(self: Arc<Self>, mut ws_source: WsSource) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<Incoming>(&text) {
                        Ok(incoming) => self.dispatch(incoming),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        self.close();
    }
}
