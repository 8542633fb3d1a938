//! Transport abstraction for devsync.
//!
//! This module provides a pluggable transport layer beneath a Device Link.
//! Framing, encryption and pairing belong to the transport; the link only
//! exchanges whole packet frames.
//!
//! # Design
//!
//! The transport trait is async and already connected when handed to a link:
//! - `send()` transmits one packet frame
//! - `recv()` receives one packet frame
//! - `close()` gracefully terminates
//!
//! # Example
//!
//! ```ignore
//! let (host, phone) = LoopbackTransport::pair();
//! host.send(&packet.to_bytes()?).await?;
//! let frame = phone.recv().await?;
//! ```

mod loopback;
mod mock;

pub use loopback::LoopbackTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for exchanging packet frames with one paired device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one frame.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one frame.
    ///
    /// Waits until a frame is available or the connection closes.
    ///
    /// Must be cancel-safe: [`DeviceLink::run`](crate::DeviceLink::run) polls
    /// it inside `tokio::select!` and drops the future whenever another branch
    /// wins, so dropping an unfinished `recv()` must not lose a frame.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
