//! Battery sync component.
//!
//! The local side is always the source of truth for its own battery. The
//! component reports local changes, answers BatteryRequest pulls and keeps a
//! read-only mirror of the peer's battery. The mirror is never sent back.
//!
//! On connect the component pulls the peer's status with a BatteryRequest,
//! so the mirror fills even when the peer does not push.
//!
//! The low-battery event is edge-triggered: it fires when the peer's
//! threshold classification moves into Low, not on every Low report.

use std::sync::Arc;

use devsync_types::{attr, BatteryReport, Packet, PacketType, ThresholdEvent};
use tracing::{debug, trace, warn};

use crate::channel::PacketChannel;
use crate::listeners::{ListenerId, Listeners};
use crate::observer::{LocalStateObserver, Subscription};

/// A battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Charge percentage, [`BatteryStatus::UNKNOWN_CHARGE`] when unknown.
    pub charge: i32,
    /// Whether the battery is charging.
    pub is_charging: bool,
}

impl BatteryStatus {
    /// Sentinel for "no reading yet".
    pub const UNKNOWN_CHARGE: i32 = -1;

    /// Create a reading.
    pub fn new(charge: i32, is_charging: bool) -> Self {
        Self {
            charge,
            is_charging,
        }
    }

    /// The reading before any data is available.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_CHARGE, false)
    }

    /// Whether the charge is a real percentage.
    pub fn is_known(&self) -> bool {
        self.charge != Self::UNKNOWN_CHARGE
    }
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Tunables for [`BatteryComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatterySettings {
    /// Charge (percent) below which a discharging battery is Low.
    pub low_threshold: i32,
    /// Push the local status when the link connects.
    pub push_on_connect: bool,
    /// Ask the peer for its status when the link connects.
    pub request_on_connect: bool,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            low_threshold: 15,
            push_on_connect: true,
            request_on_connect: true,
        }
    }
}

/// Events emitted to local listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryEvent {
    /// Battery properties were refreshed.
    Refreshed,
    /// The peer's battery just became low.
    LowBattery {
        /// Peer charge at the time of the transition.
        charge: i32,
    },
}

/// Per-link battery state.
pub struct BatteryComponent {
    channel: Arc<dyn PacketChannel>,
    observer: Arc<dyn LocalStateObserver<BatteryStatus>>,
    settings: BatterySettings,
    local: BatteryStatus,
    remote: BatteryStatus,
    remote_threshold: ThresholdEvent,
    listeners: Listeners<BatteryEvent>,
    subscription: Option<Subscription>,
}

impl BatteryComponent {
    /// Create the component, reading the initial local status.
    ///
    /// If the observer is unavailable the local charge stays unknown.
    pub fn new(
        channel: Arc<dyn PacketChannel>,
        observer: Arc<dyn LocalStateObserver<BatteryStatus>>,
        settings: BatterySettings,
    ) -> Self {
        let local = match observer.current() {
            Ok(status) => sanitize(status),
            Err(e) => {
                warn!("Battery observer unavailable, reporting unknown charge: {}", e);
                BatteryStatus::unknown()
            }
        };

        Self {
            channel,
            observer,
            settings,
            local,
            remote: BatteryStatus::unknown(),
            remote_threshold: ThresholdEvent::None,
            listeners: Listeners::new(),
            subscription: None,
        }
    }

    /// Subscribe to local battery changes; `forward` receives each reading.
    ///
    /// `forward` should hand the reading back to whoever owns this component
    /// so it is applied through [`BatteryComponent::on_local_battery_changed`].
    pub fn attach(&mut self, forward: impl Fn(BatteryStatus) + Send + Sync + 'static) {
        self.subscription = Some(self.observer.subscribe(Box::new(forward)));
    }

    /// Stop receiving local battery changes.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Whether a local subscription is active.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Register an event listener.
    pub fn on_event(&mut self, listener: impl FnMut(&BatteryEvent) + Send + 'static) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Remove an event listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Peer charge (read-only property).
    pub fn charge(&self) -> i32 {
        self.remote.charge
    }

    /// Whether the peer is charging (read-only property).
    pub fn is_charging(&self) -> bool {
        self.remote.is_charging
    }

    /// Mirror of the peer's battery.
    pub fn remote_status(&self) -> BatteryStatus {
        self.remote
    }

    /// Peer's last threshold classification.
    pub fn remote_threshold(&self) -> ThresholdEvent {
        self.remote_threshold
    }

    /// This side's battery as last observed.
    pub fn local_status(&self) -> BatteryStatus {
        self.local
    }

    /// Apply a local battery reading.
    ///
    /// Sends a BatteryStatus packet when the reading changed and always
    /// emits [`BatteryEvent::Refreshed`].
    pub fn on_local_battery_changed(&mut self, charge: i32, is_charging: bool) {
        let status = sanitize(BatteryStatus::new(charge, is_charging));
        let changed = status != self.local;
        self.local = status;

        if changed {
            self.send_local_report();
        }
        self.listeners.emit(&BatteryEvent::Refreshed);
    }

    /// Process an inbound packet. Non-battery packets are ignored.
    pub fn on_packet_received(&mut self, packet: &Packet) {
        match packet.packet_type() {
            PacketType::BatteryStatus => self.apply_remote_report(packet),
            PacketType::BatteryRequest => self.send_local_report(),
            other => trace!("Battery component ignoring {} packet", other),
        }
    }

    /// The link connected: push our status and pull the peer's.
    pub fn on_connected(&mut self) {
        if self.settings.push_on_connect {
            self.send_local_report();
        }
        if self.settings.request_on_connect {
            self.send(Packet::new(PacketType::BatteryRequest));
        }
    }

    fn apply_remote_report(&mut self, packet: &Packet) {
        let (charge, is_charging) = match (
            packet.get::<i32>(attr::CURRENT_CHARGE),
            packet.get::<bool>(attr::IS_CHARGING),
        ) {
            (Ok(charge), Ok(is_charging)) => (charge, is_charging),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Ignoring malformed battery packet {}: {}", packet.id(), e);
                return;
            }
        };

        // thresholdEvent is optional; a bad value reads as None.
        let threshold = if packet.has(attr::THRESHOLD_EVENT) {
            packet
                .get::<ThresholdEvent>(attr::THRESHOLD_EVENT)
                .unwrap_or_else(|e| {
                    warn!("Bad threshold event in battery packet {}: {}", packet.id(), e);
                    ThresholdEvent::None
                })
        } else {
            ThresholdEvent::None
        };

        let previous = self.remote_threshold;
        self.remote = BatteryStatus::new(charge, is_charging);
        self.remote_threshold = threshold;

        self.listeners.emit(&BatteryEvent::Refreshed);
        if threshold == ThresholdEvent::Low && previous != ThresholdEvent::Low {
            self.listeners.emit(&BatteryEvent::LowBattery { charge });
        }
    }

    fn send_local_report(&self) {
        let report = BatteryReport {
            current_charge: self.local.charge,
            is_charging: self.local.is_charging,
            threshold_event: Some(ThresholdEvent::classify(
                self.local.charge,
                self.local.is_charging,
                self.settings.low_threshold,
            )),
        };

        match Packet::with_body(PacketType::BatteryStatus, &report) {
            Ok(packet) => self.send(packet),
            Err(e) => warn!("Failed to build battery packet: {}", e),
        }
    }

    fn send(&self, packet: Packet) {
        if let Err(e) = self.channel.send(packet) {
            debug!("Dropped battery packet: {}", e);
        }
    }
}

impl std::fmt::Debug for BatteryComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatteryComponent")
            .field("settings", &self.settings)
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("remote_threshold", &self.remote_threshold)
            .field("attached", &self.subscription.is_some())
            .finish()
    }
}

fn sanitize(status: BatteryStatus) -> BatteryStatus {
    if (0..=100).contains(&status.charge) || status.charge == BatteryStatus::UNKNOWN_CHARGE {
        status
    } else {
        warn!("Battery charge {} out of range, treating as unknown", status.charge);
        BatteryStatus::new(BatteryStatus::UNKNOWN_CHARGE, status.is_charging)
    }
}
