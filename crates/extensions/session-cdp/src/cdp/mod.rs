//! Minimal Chrome DevTools Protocol client.
//!
//! One WebSocket per browser; page sessions are multiplexed over it with
//! flattened `sessionId`s.

mod client;
mod error;
mod protocol;
mod session;
mod transport;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::TargetInfo;
pub use session::PageSession;
