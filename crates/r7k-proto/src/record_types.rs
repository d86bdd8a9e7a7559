//! Record type identifiers.
//!
//! Every data record frame names its content with a `u32` record type ID in
//! the DRF header. This core never interprets sonar payloads, so only the IDs
//! it needs to route control traffic, plus the common telemetry records that
//! clients subscribe to, are named here.
//!
//! # Ranges
//!
//! - `1000-1999`: Sensor records (position, attitude, ...)
//! - `7000-7499`: Sonar records (settings, bathymetry, beam data, ...)
//! - `7500-7599`: Remote control and its replies

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Known record types
///
/// Unknown IDs are legal on the wire; headers expose the raw `u32` and
/// [`RecordType::from_u32`] returns `None` for IDs not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum RecordType {
    // Sensor records
    /// Vessel position
    Position = 1003,

    // Sonar records
    /// Current sonar settings
    SonarSettings = 7000,
    /// System configuration (device list)
    Configuration = 7001,
    /// Receive beam geometry
    BeamGeometry = 7004,
    /// Bathymetric soundings
    Bathymetry = 7006,
    /// Raw bottom detections
    RawDetection = 7027,

    // Remote control
    /// Remote control request (subscribe, unsubscribe, request record)
    RemoteControl = 7500,
    /// Positive acknowledgement of a remote control request
    RemoteControlAck = 7501,
    /// Negative acknowledgement of a remote control request
    RemoteControlNak = 7502,
    /// Sonar settings pushed in response to remote control
    RemoteControlSonarSettings = 7503,
}

impl RecordType {
    /// Convert to raw u32 value
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    /// Convert from raw u32 value
    ///
    /// Returns `None` if the value doesn't correspond to a known record type.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1003 => Some(Self::Position),

            7000 => Some(Self::SonarSettings),
            7001 => Some(Self::Configuration),
            7004 => Some(Self::BeamGeometry),
            7006 => Some(Self::Bathymetry),
            7027 => Some(Self::RawDetection),

            7500 => Some(Self::RemoteControl),
            7501 => Some(Self::RemoteControlAck),
            7502 => Some(Self::RemoteControlNak),
            7503 => Some(Self::RemoteControlSonarSettings),

            _ => None,
        }
    }

    /// True for the ACK/NAK replies to a remote control request.
    #[must_use]
    pub const fn is_control_reply(self) -> bool {
        matches!(self, Self::RemoteControlAck | Self::RemoteControlNak)
    }
}

impl From<RecordType> for u32 {
    fn from(value: RecordType) -> Self {
        value.to_u32()
    }
}

/// Remote control command carried in the record type header of a
/// [`RecordType::RemoteControl`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum RemoteControlId {
    /// Ask for a single record of a given type
    RequestRecord = 1050,
    /// Subscribe to a list of record types
    Subscribe = 1051,
    /// Drop all subscriptions
    Unsubscribe = 1052,
}

impl RemoteControlId {
    /// Convert to raw u32 value
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    /// Convert from raw u32 value
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1050 => Some(Self::RequestRecord),
            1051 => Some(Self::Subscribe),
            1052 => Some(Self::Unsubscribe),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_round_trip() {
        let types = [
            RecordType::Position,
            RecordType::SonarSettings,
            RecordType::Bathymetry,
            RecordType::RemoteControl,
            RecordType::RemoteControlAck,
            RecordType::RemoteControlNak,
        ];

        for record_type in types {
            assert_eq!(RecordType::from_u32(record_type.to_u32()), Some(record_type));
        }
    }

    #[test]
    fn unknown_record_type() {
        assert_eq!(RecordType::from_u32(0), None);
        assert_eq!(RecordType::from_u32(9999), None);
    }

    #[test]
    fn only_ack_and_nak_are_replies() {
        assert!(RecordType::RemoteControlAck.is_control_reply());
        assert!(RecordType::RemoteControlNak.is_control_reply());
        assert!(!RecordType::RemoteControl.is_control_reply());
        assert!(!RecordType::RemoteControlSonarSettings.is_control_reply());
    }

    #[test]
    fn remote_control_ids() {
        assert_eq!(RemoteControlId::Subscribe.to_u32(), 1051);
        assert_eq!(RemoteControlId::from_u32(1052), Some(RemoteControlId::Unsubscribe));
        assert_eq!(RemoteControlId::from_u32(7500), None);
    }
}
