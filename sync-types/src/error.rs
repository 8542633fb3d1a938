//! Error types for devsync packets.

use thiserror::Error;

/// Errors that can occur while building, encoding or decoding packets.
#[derive(Debug, Error)]
pub enum PacketError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A required attribute is absent from the packet body
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// An attribute is present but holds the wrong kind of value
    #[error("invalid attribute {key}: {reason}")]
    InvalidAttribute {
        /// Attribute key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// The packet body does not match the expected shape
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Device identifier is empty or contains unsupported characters
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PacketError::MissingAttribute("isLocked".into());
        assert_eq!(err.to_string(), "missing attribute: isLocked");

        let err = PacketError::InvalidAttribute {
            key: "setLocked".into(),
            reason: "expected bool".into(),
        };
        assert_eq!(err.to_string(), "invalid attribute setLocked: expected bool");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PacketError>();
    }
}
