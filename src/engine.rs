//! Engine selection. The only place that branches on the engine kind.

use tablewatch_config::Config;
use tablewatch_protocols::{EngineKind, PageSource};
use tablewatch_session_cdp::{CdpPageSource, CdpSourceConfig};
use tablewatch_session_http::{HttpPageSource, HttpSourceConfig};

pub(crate) fn build_source(config: &Config) -> Box<dyn PageSource> {
    let browser = &config.browser;
    match browser.engine {
        EngineKind::Http => {
            let mut http = HttpSourceConfig::new(config.source.url.clone());
            http.user_agent = browser.user_agent.clone();
            http.navigation_attempts = browser.navigation_attempts;
            http.navigation_backoff = browser.navigation_backoff();
            Box::new(HttpPageSource::new(http))
        }
        kind => Box::new(CdpPageSource::new(cdp_config(kind, config))),
    }
}

fn cdp_config(kind: EngineKind, config: &Config) -> CdpSourceConfig {
    let browser = &config.browser;
    let mut cdp = CdpSourceConfig::new(kind, config.source.url.clone());
    cdp.launch.executable = browser.executable.clone();
    cdp.launch.headless = browser.headless;
    cdp.launch.user_agent = browser.user_agent.clone();
    cdp.launch.window_width = browser.window_width;
    cdp.launch.window_height = browser.window_height;
    cdp.remote_endpoint = browser.remote_endpoint.clone();
    cdp.navigation_attempts = browser.navigation_attempts;
    cdp.navigation_backoff = browser.navigation_backoff();
    // No single command may outlive a content read.
    cdp.command_timeout = browser.read_timeout();
    cdp.popup_link_text = Some(config.source.popup.link_text.clone()).filter(|text| !text.is_empty());
    cdp.screenshot_dir = browser.screenshot_dir.clone();
    cdp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_selected_from_config() {
        let mut config = Config::default();
        config.source.url = "https://example.com".to_string();

        config.browser.engine = EngineKind::Http;
        assert_eq!(build_source(&config).kind(), EngineKind::Http);

        config.browser.engine = EngineKind::Edge;
        assert_eq!(build_source(&config).kind(), EngineKind::Edge);
    }

    #[test]
    fn test_cdp_commands_bounded_by_read_timeout() {
        let mut config = Config::default();
        config.source.url = "https://example.com".to_string();
        config.browser.read_timeout_secs = 7;
        config.source.popup.link_text = String::new();

        let cdp = cdp_config(EngineKind::Chrome, &config);
        assert_eq!(cdp.command_timeout, std::time::Duration::from_secs(7));
        assert!(cdp.popup_link_text.is_none());
    }
}
