//! Packet Channel capability.
//!
//! Sending is fire-and-forget: a component hands the packet over and moves
//! on. There are no acknowledgements and no retries; a failed send leaves the
//! peer with stale state until the next packet.

use devsync_types::{Packet, PacketType};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The link behind the channel is gone.
    #[error("channel closed")]
    Closed,

    /// The packet could not be handed to the transport.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound side of a Device Link.
pub trait PacketChannel: Send + Sync {
    /// Queue `packet` for delivery to the paired device.
    fn send(&self, packet: Packet) -> Result<(), ChannelError>;
}

/// Channel that records every packet instead of delivering it.
///
/// Clones share state.
#[derive(Debug, Default, Clone)]
pub struct RecordingChannel {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    sent: Vec<Packet>,
    fail_next_send: Option<String>,
    closed: bool,
}

impl RecordingChannel {
    /// Create an empty recording channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// All packets sent so far.
    pub fn sent(&self) -> Vec<Packet> {
        self.lock().sent.clone()
    }

    /// Drain recorded packets.
    pub fn take_sent(&self) -> Vec<Packet> {
        std::mem::take(&mut self.lock().sent)
    }

    /// The most recent packet.
    pub fn last_sent(&self) -> Option<Packet> {
        self.lock().sent.last().cloned()
    }

    /// Number of recorded packets of the given type.
    pub fn count_of(&self, packet_type: &PacketType) -> usize {
        self.lock()
            .sent
            .iter()
            .filter(|p| p.packet_type() == packet_type)
            .count()
    }

    /// Cause the next send to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Reject every further send with [`ChannelError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PacketChannel for RecordingChannel {
    fn send(&self, packet: Packet) -> Result<(), ChannelError> {
        let mut inner = self.lock();

        if inner.closed {
            return Err(ChannelError::Closed);
        }

        if let Some(error) = inner.fail_next_send.take() {
            return Err(ChannelError::SendFailed(error));
        }

        inner.sent.push(packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let channel = RecordingChannel::new();
        channel.send(Packet::new(PacketType::LockStatus)).unwrap();
        channel.send(Packet::new(PacketType::BatteryRequest)).unwrap();

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].packet_type(), &PacketType::LockStatus);
        assert_eq!(
            channel.last_sent().unwrap().packet_type(),
            &PacketType::BatteryRequest
        );
        assert_eq!(channel.count_of(&PacketType::LockStatus), 1);
    }

    #[test]
    fn take_sent_drains() {
        let channel = RecordingChannel::new();
        channel.send(Packet::new(PacketType::LockStatus)).unwrap();
        assert_eq!(channel.take_sent().len(), 1);
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn forced_send_failure() {
        let channel = RecordingChannel::new();
        channel.fail_next_send("buffer full");

        let result = channel.send(Packet::new(PacketType::LockStatus));
        assert!(matches!(result, Err(ChannelError::SendFailed(_))));

        // Next send should work
        channel.send(Packet::new(PacketType::LockStatus)).unwrap();
        assert_eq!(channel.sent().len(), 1);
    }

    #[test]
    fn closed_channel_rejects() {
        let channel = RecordingChannel::new();
        channel.close();
        assert!(matches!(
            channel.send(Packet::new(PacketType::LockStatus)),
            Err(ChannelError::Closed)
        ));
    }

    #[test]
    fn clone_shares_state() {
        let a = RecordingChannel::new();
        let b = a.clone();
        a.send(Packet::new(PacketType::LockStatus)).unwrap();
        assert_eq!(b.sent().len(), 1);
    }
}
