// MIT License - Copyright (c) 2026 Peter Wright
// Client library for Lutron Homeworks Series 4/8 controllers
//
//! # homeworks
//!
//! Client for Lutron Homeworks Series 4 and 8 lighting controllers, reached
//! over TCP through a serial-to-Ethernet adaptor (typically a Moxa NPort).
//!
//! The client logs in if the controller asks for it, enables keypad, scene,
//! dimmer and LED monitoring, and turns the controller's text output into
//! typed [`HomeworksEvent`]s delivered to a handler from a background task.
//! Lost connections are re-established automatically.
//!
//! ## Quick Start
//!
//! ```no_run
//! use homeworks::{ClientConfig, HomeworksClient, HomeworksEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::builder()
//!         .host("192.168.0.100")
//!         .port(4008)
//!         .credentials("lutron,integration")
//!         .build();
//!
//!     let client = HomeworksClient::open(config, |event: HomeworksEvent| {
//!         println!("{}: {} {:?}", event.name(), event.address, event.values);
//!     })
//!     .await?;
//!
//!     client.fade_level(75.0, 2.0, 0.0, "[01:01:00:02:04]").await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.stop().await?;
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod login;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use client::{ConnectionState, HomeworksClient};
pub use codec::FrameCodec;
pub use config::{ClientConfig, ClientConfigBuilder, Credentials};
pub use error::{DecodeError, HomeworksError, Result};
pub use event::{EventHandler, EventKind, FieldValue, HomeworksEvent};
pub use protocol::Command;
