use std::sync::Arc;

use super::*;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "TAB-1";
const PAGE: &str = "<html><body><table id=\"bonds\"></table></body></html>";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Scripted browser behind a fake debugging endpoint.
#[derive(Default)]
struct BrowserState {
    /// Remaining `Page.navigate` calls that report a network error.
    navigate_failures: usize,
    navigations: usize,
    popup_found: bool,
    tab_closed: bool,
    /// Stop answering commands.
    hung: bool,
    attached: usize,
    methods: Vec<String>,
}

impl BrowserState {
    fn answer(&mut self, method: &str, params: &Value) -> Option<Value> {
        self.methods.push(method.to_string());
        if self.hung {
            return None;
        }
        let result = match method {
            "Target.attachToTarget" => {
                self.attached += 1;
                self.tab_closed = false;
                json!({"sessionId": format!("SESSION-{}", self.attached)})
            }
            "Page.navigate" => {
                self.navigations += 1;
                if self.navigate_failures > 0 {
                    self.navigate_failures -= 1;
                    json!({"frameId": "F", "errorText": "net::ERR_CONNECTION_RESET"})
                } else {
                    json!({"frameId": "F"})
                }
            }
            "Runtime.evaluate" => {
                let expression = params["expression"].as_str().unwrap_or_default();
                let value = if expression == "document.readyState" {
                    json!("complete")
                } else if expression.contains("outerHTML") {
                    json!(PAGE)
                } else if expression.contains("querySelectorAll('a')") {
                    json!(self.popup_found)
                } else {
                    Value::Null
                };
                json!({"result": {"value": value}})
            }
            "Page.captureScreenshot" => json!({"data": BASE64.encode(PNG)}),
            "Target.getTargets" => {
                let infos = if self.tab_closed {
                    json!([])
                } else {
                    json!([{"targetId": TARGET, "type": "page", "url": "https://example.com/bonds"}])
                };
                json!({"targetInfos": infos})
            }
            "Target.closeTarget" => {
                self.tab_closed = true;
                json!({"success": true})
            }
            _ => json!({}),
        };
        Some(result)
    }

    fn called(&self, method: &str) -> usize {
        self.methods.iter().filter(|m| *m == method).count()
    }
}

struct FakeBrowser {
    http: MockServer,
    state: Arc<Mutex<BrowserState>>,
    _ws: tokio::task::JoinHandle<()>,
}

impl FakeBrowser {
    async fn start(state: BrowserState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_url = format!("ws://{}/devtools/browser/fake", listener.local_addr().unwrap());
        let ws = tokio::spawn(serve(listener, state.clone()));

        let http = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "FakeChrome/1.0",
                "Protocol-Version": "1.3",
                "webSocketDebuggerUrl": ws_url,
            })))
            .mount(&http)
            .await;
        Mock::given(method("PUT"))
            .and(path("/json/new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": TARGET, "type": "page"})),
            )
            .mount(&http)
            .await;

        Self { http, state, _ws: ws }
    }

    fn config(&self) -> CdpSourceConfig {
        let mut config = CdpSourceConfig::new(EngineKind::Chrome, "https://example.com/bonds");
        config.remote_endpoint = Some(self.http.uri());
        config.command_timeout = Duration::from_secs(2);
        config.teardown_timeout = Duration::from_millis(200);
        config.load_timeout = Duration::from_secs(1);
        config.navigation_backoff = Duration::from_millis(10);
        config
    }
}

/// Answer DevTools commands on every accepted socket.
async fn serve(listener: TcpListener, state: Arc<Mutex<BrowserState>>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = state.clone();
        tokio::spawn(async move {
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            let (mut tx, mut rx) = ws.split();
            while let Some(Ok(msg)) = rx.next().await {
                let Message::Text(text) = msg else {
                    continue;
                };
                let command: Value = serde_json::from_str(&text).unwrap();
                let method = command["method"].as_str().unwrap_or_default().to_string();
                let Some(result) = state.lock().answer(&method, &command["params"]) else {
                    continue;
                };
                let reply = json!({"id": command["id"], "result": result});
                if tx.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
        });
    }
}

fn attached(endpoint: &str) -> CdpPageSource {
    let mut config = CdpSourceConfig::new(EngineKind::Chrome, "https://example.com/bonds");
    config.remote_endpoint = Some(endpoint.to_string());
    config.command_timeout = Duration::from_secs(2);
    CdpPageSource::new(config)
}

#[tokio::test]
async fn test_unavailable_endpoint_is_engine_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut source = attached(&server.uri());
    let err = source.acquire().await.unwrap_err();
    assert!(matches!(err, SessionError::EngineStart(_)), "{err:?}");
    assert_eq!(source.age(), Duration::ZERO);
}

#[tokio::test]
async fn test_read_before_acquire_is_closed() {
    let mut source = attached("http://127.0.0.1:9");
    let err = source.read_content(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, SessionError::Closed));
}

#[tokio::test]
async fn test_shutdown_without_session_is_idempotent() {
    let mut source = attached("http://127.0.0.1:9");
    source.shutdown().await.unwrap();
    source.shutdown().await.unwrap();
    assert_eq!(source.kind(), EngineKind::Chrome);
}

#[test]
fn test_read_error_mapping() {
    let deadline = Duration::from_secs(5);
    assert!(matches!(
        read_error(CdpError::SessionClosed, deadline),
        SessionError::WindowLost(_)
    ));
    assert!(matches!(
        read_error(CdpError::Timeout("DOM".to_string()), deadline),
        SessionError::Timeout(d) if d == deadline
    ));
    assert!(matches!(
        read_error(CdpError::JavaScript("boom".to_string()), deadline),
        SessionError::Transport(_)
    ));
}

#[test]
fn test_popup_script_escapes_text() {
    let script = popup_script(r#"Go "on" \ now"#);
    assert!(script.contains(r#"includes("Go \"on\" \\ now")"#));
    assert!(script.contains("link.click()"));
}

#[test]
fn test_config_defaults() {
    let config = CdpSourceConfig::new(EngineKind::Edge, "https://example.com");
    assert_eq!(config.launch.kind, EngineKind::Edge);
    assert_eq!(config.navigation_attempts, 10);
    assert_eq!(config.popup_link_text.as_deref(), Some("Continue"));
    assert_eq!(config.teardown_timeout, Duration::from_secs(3));
    assert!(config.remote_endpoint.is_none());
}

#[tokio::test]
async fn test_acquire_and_read_markup() {
    let browser = FakeBrowser::start(BrowserState {
        popup_found: true,
        ..Default::default()
    })
    .await;
    let mut config = browser.config();
    config.launch.user_agent = Some("Mozilla/5.0 tablewatch".to_string());
    let mut source = CdpPageSource::new(config);

    source.acquire().await.unwrap();
    let markup = source.read_content(Duration::from_secs(2)).await.unwrap();
    assert_eq!(markup, PAGE);

    let state = browser.state.lock();
    assert_eq!(state.navigations, 1);
    assert_eq!(state.called("Network.setUserAgentOverride"), 1);
    assert_eq!(state.called("Emulation.setDeviceMetricsOverride"), 1);
    assert_eq!(state.called("Page.captureScreenshot"), 0);
}

#[tokio::test]
async fn test_navigation_retries_until_loaded() {
    let browser = FakeBrowser::start(BrowserState {
        navigate_failures: 2,
        popup_found: true,
        ..Default::default()
    })
    .await;
    let mut config = browser.config();
    config.navigation_attempts = 5;
    let mut source = CdpPageSource::new(config);

    source.acquire().await.unwrap();
    assert_eq!(browser.state.lock().navigations, 3);
}

#[tokio::test]
async fn test_navigation_exhausted_closes_tab() {
    let browser = FakeBrowser::start(BrowserState {
        navigate_failures: usize::MAX,
        ..Default::default()
    })
    .await;
    let mut config = browser.config();
    config.navigation_attempts = 3;
    let mut source = CdpPageSource::new(config);

    let err = source.acquire().await.unwrap_err();
    assert!(
        matches!(err, SessionError::NavigationExhausted { attempts: 3, .. }),
        "{err:?}"
    );
    let state = browser.state.lock();
    assert_eq!(state.navigations, 3);
    assert_eq!(state.called("Target.closeTarget"), 1);
    drop(state);
    assert_eq!(source.age(), Duration::ZERO);
}

#[tokio::test]
async fn test_undismissed_popup_saves_screenshot() {
    let browser = FakeBrowser::start(BrowserState::default()).await;
    let shots = tempfile::TempDir::new().unwrap();
    let mut config = browser.config();
    config.screenshot_dir = Some(shots.path().join("shots"));
    let mut source = CdpPageSource::new(config);

    source.acquire().await.unwrap();

    let saved: Vec<_> = std::fs::read_dir(shots.path().join("shots"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(std::fs::read(&saved[0]).unwrap(), PNG);
    assert!(source.read_content(Duration::from_secs(2)).await.is_ok());
}

#[tokio::test]
async fn test_closed_tab_is_window_lost() {
    let browser = FakeBrowser::start(BrowserState {
        popup_found: true,
        ..Default::default()
    })
    .await;
    let mut source = CdpPageSource::new(browser.config());
    source.acquire().await.unwrap();

    browser.state.lock().tab_closed = true;
    let err = source.read_content(Duration::from_secs(2)).await.unwrap_err();
    assert!(matches!(err, SessionError::WindowLost(_)), "{err:?}");
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_refresh_replaces_session() {
    let browser = FakeBrowser::start(BrowserState {
        popup_found: true,
        ..Default::default()
    })
    .await;
    let mut source = CdpPageSource::new(browser.config());
    source.acquire().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = source.age();

    source.refresh().await.unwrap();

    assert!(source.age() < before);
    {
        let state = browser.state.lock();
        assert_eq!(state.attached, 2);
        assert_eq!(state.navigations, 2);
        assert_eq!(state.called("Target.closeTarget"), 1);
    }
    assert_eq!(source.read_content(Duration::from_secs(2)).await.unwrap(), PAGE);
}

#[tokio::test]
async fn test_hung_browser_read_times_out_and_teardown_is_bounded() {
    let browser = FakeBrowser::start(BrowserState {
        popup_found: true,
        ..Default::default()
    })
    .await;
    let mut config = browser.config();
    config.command_timeout = Duration::from_secs(30);
    let mut source = CdpPageSource::new(config);
    source.acquire().await.unwrap();

    browser.state.lock().hung = true;
    let err = source.read_content(Duration::from_millis(200)).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout(_)), "{err:?}");

    let started = std::time::Instant::now();
    source.shutdown().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
    assert_eq!(browser.state.lock().called("Target.closeTarget"), 1);
}

#[tokio::test]
async fn test_unanswered_discovery_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/version"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let mut config = CdpSourceConfig::new(EngineKind::Chrome, "https://example.com/bonds");
    config.remote_endpoint = Some(server.uri());
    config.command_timeout = Duration::from_millis(300);
    let mut source = CdpPageSource::new(config);

    let result = tokio::time::timeout(Duration::from_secs(10), source.acquire())
        .await
        .expect("acquire must give up on its own");
    assert!(matches!(result, Err(SessionError::EngineStart(_))), "{result:?}");
}
