//! DeviceLink - the paired connection to one remote device.
//!
//! A link owns one [`BatteryComponent`] and one [`LockComponent`] and is the
//! single execution context they run on: inbound packets, local observer
//! notifications and outbound sends are all serialized through it.
//!
//! # Architecture
//!
//! ```text
//! Observers ──► local queue ──┐
//!                             ▼
//! Transport ──► decode ──► DeviceLink ──► components ──► outbound queue ──► Transport
//! ```
//!
//! Observer callbacks never touch a component directly; they enqueue a
//! [`LocalChange`] that the link applies on its next turn.
//!
//! # Example
//!
//! ```ignore
//! let (host_end, phone_end) = LoopbackTransport::pair();
//! let mut link = DeviceLink::new(peer_id, &config, battery_observer, session);
//! link.run(&host_end, shutdown_signal).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use devsync_core::{
    BatteryComponent, BatterySettings, BatteryStatus, LocalStateObserver, LockComponent,
    LockSettings, SessionLock,
};
use devsync_types::{DeviceId, Packet};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::channel::QueueChannel;
use crate::config::LinkConfig;
use crate::transport::{Transport, TransportError};

/// Link errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A change reported by a Local State Observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChange {
    /// New local battery reading.
    Battery(BatteryStatus),
    /// New local session lock hint.
    Lock(bool),
}

/// Per-device protocol state.
pub struct DeviceLink {
    peer: DeviceId,
    battery: BatteryComponent,
    lock: LockComponent,
    channel: Arc<QueueChannel>,
    outbound_rx: mpsc::UnboundedReceiver<Packet>,
    local_rx: mpsc::UnboundedReceiver<LocalChange>,
}

impl DeviceLink {
    /// Create a link to `peer` and subscribe both components to their observers.
    pub fn new(
        peer: DeviceId,
        config: &LinkConfig,
        battery_observer: Arc<dyn LocalStateObserver<BatteryStatus>>,
        session: Arc<dyn SessionLock>,
    ) -> Self {
        let (channel, outbound_rx) = QueueChannel::new();
        let channel = Arc::new(channel);
        let (local_tx, local_rx) = mpsc::unbounded_channel();

        let mut battery = BatteryComponent::new(
            channel.clone(),
            battery_observer,
            BatterySettings::from(&config.battery),
        );
        let mut lock = LockComponent::new(
            channel.clone(),
            session,
            LockSettings::from(&config.lock),
        );

        let tx = local_tx.clone();
        battery.attach(move |status| {
            let _ = tx.send(LocalChange::Battery(status));
        });
        lock.attach(move |locked| {
            let _ = local_tx.send(LocalChange::Lock(locked));
        });

        debug!("Created link to {}", peer);

        Self {
            peer,
            battery,
            lock,
            channel,
            outbound_rx,
            local_rx,
        }
    }

    /// The paired device.
    pub fn peer(&self) -> &DeviceId {
        &self.peer
    }

    /// Battery component (exported `charge` / `isCharging` / `refreshed`).
    pub fn battery(&self) -> &BatteryComponent {
        &self.battery
    }

    /// Mutable battery component, for registering listeners.
    pub fn battery_mut(&mut self) -> &mut BatteryComponent {
        &mut self.battery
    }

    /// Lock component (exported `isLocked` / `lockedChanged`).
    pub fn lock(&self) -> &LockComponent {
        &self.lock
    }

    /// Mutable lock component, for listeners and `set_locked`.
    pub fn lock_mut(&mut self) -> &mut LockComponent {
        &mut self.lock
    }

    /// Whether the link still accepts outbound packets.
    pub fn is_active(&self) -> bool {
        self.channel.is_open()
    }

    /// The transport came up: let each component announce itself.
    pub fn connected(&mut self) {
        info!("Link to {} connected", self.peer);
        self.battery.on_connected();
        self.lock.on_connected();
    }

    /// Route an inbound packet to the component that owns its type.
    pub fn handle_packet(&mut self, packet: &Packet) {
        let packet_type = packet.packet_type();
        if packet_type.is_battery() {
            self.battery.on_packet_received(packet);
        } else if packet_type.is_lock() {
            self.lock.on_packet_received(packet);
        } else {
            trace!("Ignoring {} packet from {}", packet_type, self.peer);
        }
    }

    /// Apply a local observer notification.
    pub fn handle_local(&mut self, change: LocalChange) {
        match change {
            LocalChange::Battery(status) => self
                .battery
                .on_local_battery_changed(status.charge, status.is_charging),
            LocalChange::Lock(locked) => self.lock.on_local_lock_changed(locked),
        }
    }

    /// Apply every pending local notification. Returns how many were applied.
    pub fn process_local_changes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(change) = self.local_rx.try_recv() {
            self.handle_local(change);
            applied += 1;
        }
        applied
    }

    /// Take every queued outbound packet without sending it.
    pub fn drain_outbound(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.outbound_rx.try_recv() {
            packets.push(packet);
        }
        packets
    }

    /// Tear down: unsubscribe from observers and stop accepting sends.
    ///
    /// Packets still queued are discarded.
    pub fn disconnect(&mut self) {
        self.battery.detach();
        self.lock.detach();
        self.channel.close();
        let dropped = self.drain_outbound().len();
        if dropped > 0 {
            debug!("Discarded {} queued packets for {}", dropped, self.peer);
        }
        info!("Link to {} disconnected", self.peer);
    }

    /// Drive the link over `transport` until `shutdown` resolves or the
    /// transport closes.
    ///
    /// Calls [`DeviceLink::connected`] first and [`DeviceLink::disconnect`]
    /// on the way out, after flushing whatever was queued.
    pub async fn run<T, F>(&mut self, transport: &T, shutdown: F) -> Result<(), LinkError>
    where
        T: Transport + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.connected();
        self.flush(transport).await;

        let result = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(()),
                Some(change) = self.local_rx.recv() => self.handle_local(change),
                inbound = transport.recv() => match inbound {
                    Ok(frame) => match Packet::from_bytes(&frame) {
                        Ok(packet) => self.handle_packet(&packet),
                        Err(e) => warn!("Dropping undecodable frame from {}: {}", self.peer, e),
                    },
                    Err(TransportError::ConnectionClosed) | Err(TransportError::NotConnected) => {
                        break Ok(());
                    }
                    Err(TransportError::ReceiveFailed(e)) => {
                        warn!("Receive from {} failed: {}", self.peer, e);
                    }
                    Err(e) => break Err(LinkError::Transport(e)),
                },
            }
            self.flush(transport).await;
        };

        self.flush(transport).await;
        self.disconnect();
        if let Err(e) = transport.close().await {
            debug!("Closing transport to {} failed: {}", self.peer, e);
        }
        result
    }

    async fn flush<T: Transport + ?Sized>(&mut self, transport: &T) {
        while let Ok(packet) = self.outbound_rx.try_recv() {
            let frame = match packet.to_bytes() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to encode {} packet: {}", packet.packet_type(), e);
                    continue;
                }
            };
            if let Err(e) = transport.send(&frame).await {
                debug!(
                    "Dropped {} packet to {}: {}",
                    packet.packet_type(),
                    self.peer,
                    e
                );
            }
        }
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        self.battery.detach();
        self.lock.detach();
        self.channel.close();
    }
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("peer", &self.peer)
            .field("battery", &self.battery)
            .field("lock", &self.lock)
            .field("active", &self.channel.is_open())
            .finish()
    }
}
