//! # sync-core
//!
//! State sync components for devsync (no I/O, instant tests).
//!
//! Two components keep a paired device's view of local state fresh:
//!
//! - [`BatteryComponent`] - one-directional: this side is the source of truth
//!   for its own battery and mirrors the peer's battery read-only.
//! - [`LockComponent`] - two-directional: each side owns its lock flag, tracks
//!   the peer's last-known flag and may command the peer to lock/unlock.
//!
//! ## Design Philosophy
//!
//! Components never touch the network or the OS directly. They talk to two
//! injected capabilities:
//! - [`PacketChannel`] - fire-and-forget packet sending
//! - [`LocalStateObserver`] - current value + change notifications
//!
//! Every operation runs to completion synchronously, and listener callbacks
//! fire before the operation returns. This keeps event counts deterministic
//! in tests, which drive the components through [`ManualObserver`],
//! [`ManualSession`] and [`RecordingChannel`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod battery;
pub mod channel;
pub mod listeners;
pub mod lock;
pub mod observer;

pub use battery::{BatteryComponent, BatteryEvent, BatterySettings, BatteryStatus};
pub use channel::{ChannelError, PacketChannel, RecordingChannel};
pub use listeners::{ListenerId, Listeners};
pub use lock::{LockComponent, LockSettings, PeerLock};
pub use observer::{
    Callback, LocalStateObserver, ManualObserver, ManualSession, ObserverError, SessionLock,
    Subscription,
};
