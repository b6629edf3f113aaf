//! Browser-backed page source for tablewatch.
//!
//! Drives Chrome, Chromium or Edge over the DevTools protocol: launches a
//! private browser (or attaches to a running one), navigates to the watched
//! page, dismisses its interstitial and hands back the rendered markup.

mod cdp;
mod launcher;
mod source;

pub use cdp::{CdpClient, CdpError, PageSession, TargetInfo};
pub use launcher::{LaunchOptions, LaunchedBrowser, find_executable};
pub use source::{CdpPageSource, CdpSourceConfig};
