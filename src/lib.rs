// MIT License - Copyright (c) 2026 Peter Wright
// lircd socket client for set-top-box testing
//
//! # stb-lirc
//!
//! Client for the lircd infrared daemon's socket protocol, used to drive
//! automated set-top-box tests by sending remote-control key presses and
//! reporting whether each transmission succeeded.
//!
//! - [`protocol`] encodes commands and parses reply packets.
//! - [`LircClient`] owns one socket and runs one exchange at a time.
//! - [`RemoteController`] presses keys on a named remote with repeat and
//!   inter-press delay, recording timestamps for each press.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stb_lirc::{ClientConfig, LircClient, RemoteController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::builder()
//!         .socket_path("/var/run/lirc/lircd")
//!         .remote_name("sonifi-remote")
//!         .build();
//!
//!     let client = LircClient::from_config(&config).await?;
//!     println!("lircd {:?}", client.version().await?.data);
//!
//!     let remote = RemoteController::new(Arc::new(client), &config.remote_name);
//!     let press = remote.press_once("KEY_POWER").await?;
//!     println!("{} success={}", press.key, press.success);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod remote;

#[cfg(test)]
mod fake_lircd;

// Re-exports for convenience
pub use client::{LircClient, TimedReply};
pub use config::{ClientConfig, ClientConfigBuilder, Settings};
pub use error::{LircError, Result};
pub use protocol::{Command, ReplyPacket};
pub use remote::{KeyPress, RemoteController};
