//! # sync-link
//!
//! Device link for devsync.
//!
//! A [`DeviceLink`] is the paired connection to exactly one remote device.
//! It owns that device's battery and lock sync components and drives them
//! from a [`Transport`].
//!
//! ## Features
//!
//! - **Single execution context**: packets and local notifications are
//!   applied one at a time, in arrival order
//! - **Fire-and-forget sends**: outbound packets are queued and flushed;
//!   failures are logged and dropped
//! - **Transport Abstraction**: pluggable transport layer (loopback, mock)
//! - **TOML configuration**: [`LinkConfig`]
//!
//! ## Example
//!
//! ```ignore
//! use devsync_link::{DeviceLink, LinkConfig, LoopbackTransport};
//!
//! let config = LinkConfig::from_file("devsync.toml".as_ref())?;
//! let (host_end, _phone_end) = LoopbackTransport::pair();
//! let mut link = DeviceLink::new(peer_id, &config, battery_observer, session);
//!
//! link.lock_mut().on_locked_changed(|locked| println!("peer locked: {locked}"));
//! link.run(&host_end, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod link;
pub mod transport;

pub use channel::QueueChannel;
pub use config::{BatteryConfig, ConfigError, DeviceConfig, LinkConfig, LockConfig};
pub use link::{DeviceLink, LinkError, LocalChange};
pub use transport::{LoopbackTransport, MockTransport, Transport, TransportError};
