//! Typed packet bodies and attribute keys.

use serde::{Deserialize, Serialize};

/// Attribute keys used in packet bodies.
pub mod attr {
    /// BatteryStatus: charge percentage, `-1` when unknown.
    pub const CURRENT_CHARGE: &str = "currentCharge";
    /// BatteryStatus: whether the sender is charging.
    pub const IS_CHARGING: &str = "isCharging";
    /// BatteryStatus: optional [`ThresholdEvent`](super::ThresholdEvent).
    pub const THRESHOLD_EVENT: &str = "thresholdEvent";
    /// LockStatus: sender's own lock state.
    pub const IS_LOCKED: &str = "isLocked";
    /// LockRequest: "tell me your state" (value ignored).
    pub const REQUEST_LOCKED: &str = "requestLocked";
    /// LockRequest: "change your state to this".
    pub const SET_LOCKED: &str = "setLocked";
}

/// Battery threshold classification carried by BatteryStatus packets.
///
/// Encoded as an integer. Only `1` means Low; every other value decodes
/// as `None` so newer peers can add event kinds without breaking us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ThresholdEvent {
    /// No threshold crossed
    #[default]
    None,
    /// Battery is low and not charging
    Low,
}

impl ThresholdEvent {
    /// Classify a battery reading against `low_threshold` (percent).
    ///
    /// Unknown charge (negative) is never Low.
    pub fn classify(charge: i32, is_charging: bool, low_threshold: i32) -> Self {
        if charge >= 0 && charge < low_threshold && !is_charging {
            Self::Low
        } else {
            Self::None
        }
    }
}

impl From<i64> for ThresholdEvent {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Low,
            _ => Self::None,
        }
    }
}

impl From<ThresholdEvent> for i64 {
    fn from(event: ThresholdEvent) -> Self {
        match event {
            ThresholdEvent::None => 0,
            ThresholdEvent::Low => 1,
        }
    }
}

/// Body of a BatteryStatus packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReport {
    /// Charge percentage (0..=100), `-1` when unknown
    pub current_charge: i32,
    /// Whether the sender is charging
    pub is_charging: bool,
    /// Threshold classification, absent on older peers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_event: Option<ThresholdEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Packet, PacketType};

    #[test]
    fn classify_low_only_when_discharging_below_threshold() {
        assert_eq!(ThresholdEvent::classify(10, false, 15), ThresholdEvent::Low);
        assert_eq!(ThresholdEvent::classify(10, true, 15), ThresholdEvent::None);
        assert_eq!(ThresholdEvent::classify(15, false, 15), ThresholdEvent::None);
        assert_eq!(ThresholdEvent::classify(-1, false, 15), ThresholdEvent::None);
    }

    #[test]
    fn threshold_event_is_an_integer_on_the_wire() {
        assert_eq!(serde_json::to_string(&ThresholdEvent::Low).unwrap(), "1");
        assert_eq!(serde_json::to_string(&ThresholdEvent::None).unwrap(), "0");
        let unknown: ThresholdEvent = serde_json::from_str("7").unwrap();
        assert_eq!(unknown, ThresholdEvent::None);
    }

    #[test]
    fn battery_report_uses_camel_case_keys() {
        let report = BatteryReport {
            current_charge: 42,
            is_charging: true,
            threshold_event: Some(ThresholdEvent::None),
        };
        let packet = Packet::with_body(PacketType::BatteryStatus, &report).unwrap();

        assert_eq!(packet.get::<i32>(attr::CURRENT_CHARGE).unwrap(), 42);
        assert!(packet.get::<bool>(attr::IS_CHARGING).unwrap());
        assert_eq!(packet.get::<i64>(attr::THRESHOLD_EVENT).unwrap(), 0);
        assert_eq!(packet.body_as::<BatteryReport>().unwrap(), report);
    }

    #[test]
    fn threshold_event_is_optional() {
        let packet = Packet::new(PacketType::BatteryStatus)
            .with(attr::CURRENT_CHARGE, 80)
            .with(attr::IS_CHARGING, false);
        let report: BatteryReport = packet.body_as().unwrap();
        assert_eq!(report.threshold_event, None);
    }

    #[test]
    fn battery_report_requires_charge() {
        let packet = Packet::new(PacketType::BatteryStatus).with(attr::IS_CHARGING, false);
        assert!(packet.body_as::<BatteryReport>().is_err());
    }
}
