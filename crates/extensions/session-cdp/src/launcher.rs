//! Browser process launch.
//!
//! Each launch gets a throwaway profile directory and a kernel-assigned
//! debugging port, read back from the profile's `DevToolsActivePort` file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tablewatch_protocols::EngineKind;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::cdp::CdpError;

/// How to start a browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub kind: EngineKind,
    /// Explicit executable; searched for by `kind` when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    /// How long to wait for the debugging port to appear.
    pub startup_timeout: Duration,
}

impl LaunchOptions {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            executable: None,
            headless: true,
            user_agent: None,
            window_width: 1024,
            window_height: 768,
            startup_timeout: Duration::from_secs(20),
        }
    }

    /// Command-line switches for a launch using `profile_dir`.
    pub fn args(&self, profile_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-sync".to_string(),
            "--disable-translate".to_string(),
            "--disable-extensions".to_string(),
            "--disable-plugins".to_string(),
            "--disable-popup-blocking".to_string(),
            "--mute-audio".to_string(),
            "--metrics-recording-only".to_string(),
            format!("--window-size={},{}", self.window_width, self.window_height),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args.push("about:blank".to_string());
        args
    }
}

/// Known install locations for `kind` on this platform.
fn candidates(kind: EngineKind) -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        match kind {
            EngineKind::Chrome => &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"],
            EngineKind::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
            EngineKind::Edge => &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
            EngineKind::Http => &[],
        }
    }

    #[cfg(target_os = "windows")]
    {
        match kind {
            EngineKind::Chrome => &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ],
            EngineKind::Chromium => &[r"C:\Program Files\Chromium\Application\chrome.exe"],
            EngineKind::Edge => &[
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
            ],
            EngineKind::Http => &[],
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        match kind {
            EngineKind::Chrome => &["/usr/bin/google-chrome", "/usr/bin/google-chrome-stable"],
            EngineKind::Chromium => &[
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
            ],
            EngineKind::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
            EngineKind::Http => &[],
        }
    }
}

/// Find an installed browser of the given kind.
pub fn find_executable(kind: EngineKind) -> Option<PathBuf> {
    candidates(kind)
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Parse the port from a `DevToolsActivePort` file body.
fn parse_active_port(contents: &str) -> Option<u16> {
    contents.lines().next()?.trim().parse().ok()
}

/// A browser process started by us.
pub struct LaunchedBrowser {
    child: Child,
    endpoint: String,
    _profile: TempDir,
}

impl std::fmt::Debug for LaunchedBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedBrowser")
            .field("pid", &self.child.id())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl LaunchedBrowser {
    /// Start a browser and wait until its debugging endpoint is known.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, CdpError> {
        let executable = options
            .executable
            .clone()
            .or_else(|| find_executable(options.kind))
            .ok_or_else(|| CdpError::Launch(format!("no {} executable found", options.kind)))?;

        let profile = tempfile::Builder::new().prefix("tablewatch-").tempdir()?;
        info!(
            executable = %executable.display(),
            profile = %profile.path().display(),
            "Launching browser"
        );

        let mut child = Command::new(&executable)
            .args(options.args(profile.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CdpError::Launch(format!("{}: {}", executable.display(), e)))?;

        let port_file = profile.path().join("DevToolsActivePort");
        let start = Instant::now();
        let port = loop {
            if let Ok(contents) = tokio::fs::read_to_string(&port_file).await {
                if let Some(port) = parse_active_port(&contents) {
                    break port;
                }
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(CdpError::Launch(format!("browser exited during startup: {}", status)));
            }
            if start.elapsed() > options.startup_timeout {
                let _ = child.kill().await;
                return Err(CdpError::Launch(
                    "browser did not open a debugging port in time".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        };

        let endpoint = format!("http://127.0.0.1:{}", port);
        info!(pid = ?child.id(), %endpoint, "Browser started");
        Ok(Self {
            child,
            endpoint,
            _profile: profile,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Wait briefly for the process to exit on its own, then kill it.
    pub async fn terminate(mut self, grace: Duration) {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Browser exited"),
            _ => {
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Browser process won't terminate");
                } else {
                    debug!("Browser killed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_profile_and_port() {
        let options = LaunchOptions::new(EngineKind::Chrome);
        let args = options.args(Path::new("/tmp/profile"));
        assert!(args.contains(&"--remote-debugging-port=0".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--disable-plugins".to_string()));
        assert!(args.contains(&"--window-size=1024,768".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_args_headful_with_user_agent() {
        let mut options = LaunchOptions::new(EngineKind::Edge);
        options.headless = false;
        options.user_agent = Some("Mozilla/5.0 test".to_string());
        let args = options.args(Path::new("/tmp/p"));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--user-agent=Mozilla/5.0 test".to_string()));
    }

    #[test]
    fn test_parse_active_port() {
        assert_eq!(parse_active_port("40123\n/devtools/browser/abc\n"), Some(40123));
        assert_eq!(parse_active_port(""), None);
        assert_eq!(parse_active_port("not-a-port\n"), None);
    }

    #[test]
    fn test_http_has_no_executable() {
        assert!(find_executable(EngineKind::Http).is_none());
    }

    #[tokio::test]
    async fn test_launch_missing_executable_fails() {
        let mut options = LaunchOptions::new(EngineKind::Chrome);
        options.executable = Some(PathBuf::from("/nonexistent/tablewatch/chrome"));
        let err = LaunchedBrowser::launch(&options).await.unwrap_err();
        assert!(matches!(err, CdpError::Launch(_)));
    }
}
