//! Queue-backed Packet Channel.
//!
//! Components send synchronously into an unbounded queue; the link's run
//! loop drains the queue to the transport. Once the link disconnects the
//! queue is closed and further sends are rejected.

use devsync_core::{ChannelError, PacketChannel};
use devsync_types::Packet;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Packet Channel feeding a link's outbound queue.
#[derive(Debug)]
pub struct QueueChannel {
    tx: Mutex<Option<mpsc::UnboundedSender<Packet>>>,
}

impl QueueChannel {
    /// Create the channel and the receiving end of its queue.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Reject every further send.
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Whether sends are still accepted.
    pub fn is_open(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl PacketChannel for QueueChannel {
    fn send(&self, packet: Packet) -> Result<(), ChannelError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(packet).map_err(|_| ChannelError::Closed),
            None => Err(ChannelError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsync_types::PacketType;

    #[test]
    fn sends_are_queued_in_order() {
        let (channel, mut rx) = QueueChannel::new();
        channel.send(Packet::new(PacketType::LockStatus)).unwrap();
        channel.send(Packet::new(PacketType::BatteryStatus)).unwrap();

        assert_eq!(rx.try_recv().unwrap().packet_type(), &PacketType::LockStatus);
        assert_eq!(
            rx.try_recv().unwrap().packet_type(),
            &PacketType::BatteryStatus
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_rejects_sends() {
        let (channel, mut rx) = QueueChannel::new();
        channel.close();

        assert!(!channel.is_open());
        assert!(matches!(
            channel.send(Packet::new(PacketType::LockStatus)),
            Err(ChannelError::Closed)
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (channel, rx) = QueueChannel::new();
        drop(rx);
        assert!(matches!(
            channel.send(Packet::new(PacketType::LockStatus)),
            Err(ChannelError::Closed)
        ));
    }
}
