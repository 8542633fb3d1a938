//! # sync-types
//!
//! Wire format types for the devsync device-state protocol.
//!
//! This crate provides the foundational types shared by every devsync crate:
//! - [`Packet`] - an immutable, typed, attribute-keyed message
//! - [`PacketType`] - the four packet types the protocol understands
//! - [`BatteryReport`], [`ThresholdEvent`] - typed battery body
//! - [`DeviceId`] - identity of the paired remote device
//! - [`PacketError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod body;
mod error;
mod ids;
mod packet;

pub use body::{attr, BatteryReport, ThresholdEvent};
pub use error::PacketError;
pub use ids::DeviceId;
pub use packet::{Packet, PacketType};
