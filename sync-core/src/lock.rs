//! Lock sync component.
//!
//! Each side owns its session lock flag and mirrors the peer's flag.
//! Packets are interpreted by the attributes they carry, and a single packet
//! may carry several intents:
//!
//! | attribute       | effect |
//! |-----------------|--------|
//! | `isLocked`      | update the peer mirror (event only when the value changes) |
//! | `requestLocked` | reply with our `isLocked` |
//! | `setLocked`     | lock/unlock our session, then reply with our `isLocked` |
//!
//! However many intents a packet carries, it produces at most one reply.

use std::sync::Arc;

use devsync_types::{attr, Packet, PacketType};
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::PacketChannel;
use crate::listeners::{ListenerId, Listeners};
use crate::observer::{SessionLock, Subscription};

/// What this side knows about the peer's lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerLock {
    /// No LockStatus received yet.
    #[default]
    Unknown,
    /// Last value the peer reported.
    Known(bool),
}

impl PeerLock {
    /// Exported view: unknown reads as unlocked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Known(true))
    }
}

/// Tunables for [`LockComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Ask the peer for its state when the link connects.
    pub request_on_connect: bool,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            request_on_connect: true,
        }
    }
}

/// Per-link lock state.
pub struct LockComponent {
    channel: Arc<dyn PacketChannel>,
    session: Arc<dyn SessionLock>,
    settings: LockSettings,
    local_locked: bool,
    remote: PeerLock,
    locked_changed: Listeners<bool>,
    subscription: Option<Subscription>,
}

impl LockComponent {
    /// Create the component, reading the initial local lock hint.
    ///
    /// If the session is unavailable the local flag starts unlocked.
    pub fn new(
        channel: Arc<dyn PacketChannel>,
        session: Arc<dyn SessionLock>,
        settings: LockSettings,
    ) -> Self {
        let local_locked = match session.current() {
            Ok(locked) => locked,
            Err(e) => {
                warn!("Session lock hint unavailable, assuming unlocked: {}", e);
                false
            }
        };

        Self {
            channel,
            session,
            settings,
            local_locked,
            remote: PeerLock::Unknown,
            locked_changed: Listeners::new(),
            subscription: None,
        }
    }

    /// Subscribe to local lock hint changes; `forward` receives each value.
    ///
    /// `forward` should route the value back to
    /// [`LockComponent::on_local_lock_changed`] on the owner's context.
    pub fn attach(&mut self, forward: impl Fn(bool) + Send + Sync + 'static) {
        self.subscription = Some(self.session.subscribe(Box::new(forward)));
    }

    /// Stop receiving local lock hint changes.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Whether a local subscription is active.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Register a `lockedChanged` listener.
    pub fn on_locked_changed(&mut self, listener: impl FnMut(&bool) + Send + 'static) -> ListenerId {
        self.locked_changed.register(listener)
    }

    /// Remove a `lockedChanged` listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.locked_changed.remove(id)
    }

    /// Exported `isLocked` property: the peer's lock state.
    pub fn is_locked(&self) -> bool {
        self.remote.is_locked()
    }

    /// Writing the exported `isLocked` property.
    pub fn set_locked(&mut self, locked: bool) {
        self.set_remote_locked(locked);
    }

    /// Peer lock state including the unknown case.
    pub fn remote(&self) -> PeerLock {
        self.remote
    }

    /// This side's lock flag.
    pub fn local_locked(&self) -> bool {
        self.local_locked
    }

    /// Apply a local lock hint change and report it.
    ///
    /// The report is sent even when the value did not change.
    pub fn on_local_lock_changed(&mut self, locked: bool) {
        self.local_locked = locked;
        self.send_state();
    }

    /// Command the peer to lock or unlock.
    ///
    /// Local state is untouched; the peer's mirror only moves when its
    /// LockStatus reply arrives.
    pub fn set_remote_locked(&mut self, locked: bool) {
        self.send(Packet::new(PacketType::LockRequest).with(attr::SET_LOCKED, locked));
    }

    /// Process an inbound packet.
    pub fn on_packet_received(&mut self, packet: &Packet) {
        if packet.has(attr::IS_LOCKED) {
            match packet.get::<bool>(attr::IS_LOCKED) {
                Ok(locked) => self.apply_remote(locked),
                Err(e) => warn!("Ignoring malformed lock status in packet {}: {}", packet.id(), e),
            }
        }

        let mut reply = packet.has(attr::REQUEST_LOCKED);

        if packet.has(attr::SET_LOCKED) {
            match packet.get::<bool>(attr::SET_LOCKED) {
                Ok(locked) => {
                    self.execute(locked);
                    reply = true;
                }
                Err(e) => warn!("Ignoring malformed lock command in packet {}: {}", packet.id(), e),
            }
        }

        if reply {
            self.send_state();
        }
    }

    /// The link connected: pull the peer's state.
    pub fn on_connected(&mut self) {
        if self.settings.request_on_connect {
            self.send(Packet::new(PacketType::LockRequest).with(attr::REQUEST_LOCKED, Value::Null));
        }
    }

    fn apply_remote(&mut self, locked: bool) {
        if self.remote == PeerLock::Known(locked) {
            return;
        }
        self.remote = PeerLock::Known(locked);
        self.locked_changed.emit(&locked);
    }

    fn execute(&mut self, locked: bool) {
        let result = if locked {
            self.session.lock()
        } else {
            self.session.unlock()
        };

        match result {
            Ok(()) => self.local_locked = locked,
            Err(e) => warn!(
                "Failed to {} session: {}",
                if locked { "lock" } else { "unlock" },
                e
            ),
        }
    }

    fn send_state(&self) {
        self.send(Packet::new(PacketType::LockStatus).with(attr::IS_LOCKED, self.local_locked));
    }

    fn send(&self, packet: Packet) {
        if let Err(e) = self.channel.send(packet) {
            debug!("Dropped lock packet: {}", e);
        }
    }
}

impl std::fmt::Debug for LockComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockComponent")
            .field("settings", &self.settings)
            .field("local_locked", &self.local_locked)
            .field("remote", &self.remote)
            .field("attached", &self.subscription.is_some())
            .finish()
    }
}
