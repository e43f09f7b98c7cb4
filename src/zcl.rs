//! IAS zone cluster wire types
//!
//! Minimal ZCL-flavored value model for the attributes and commands the
//! enrollment pipeline touches. Whatever radio stack sits behind the
//! [`ZoneTransport`](crate::ZoneTransport) trait maps these onto its own
//! frame encoding.

use std::collections::HashMap;

use serde::Serialize;

/// Standard IAS zone type: motion sensor
pub const ZONE_TYPE_MOTION: u16 = 0x000D;
/// Standard IAS zone type: contact switch (door/window)
pub const ZONE_TYPE_CONTACT: u16 = 0x0015;
/// Standard IAS zone type: fire sensor
pub const ZONE_TYPE_FIRE: u16 = 0x0028;
/// Standard IAS zone type: water leak sensor
pub const ZONE_TYPE_WATER: u16 = 0x002A;
/// Standard IAS zone type: personal emergency device (SOS button)
pub const ZONE_TYPE_EMERGENCY: u16 = 0x002C;

/// Attributes of the IAS zone cluster used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneAttribute {
    /// CIE (hub) IEEE address the device reports to
    CieAddress,
    /// Zone type code (motion, contact, emergency, ...)
    ZoneType,
    /// Enrollment state (`NotEnrolled` / `Enrolled`)
    ZoneState,
    /// Current zone status bitmask
    ZoneStatus,
    /// Zone id assigned by the hub
    ZoneId,
}

impl std::fmt::Display for ZoneAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CieAddress => write!(f, "cie_address"),
            Self::ZoneType => write!(f, "zone_type"),
            Self::ZoneState => write!(f, "zone_state"),
            Self::ZoneStatus => write!(f, "zone_status"),
            Self::ZoneId => write!(f, "zone_id"),
        }
    }
}

/// A typed IAS zone attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue {
    /// 8-bit enumeration
    Enum8(u8),
    /// 16-bit enumeration
    Enum16(u16),
    /// 16-bit bitmap
    Bitmap16(u16),
    /// IEEE EUI-64 address
    Eui64([u8; 8]),
}

impl AttributeValue {
    /// Coerce the value to an integer, regardless of wire type.
    ///
    /// EUI-64 values coerce big-endian, which matters only for display.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        match self {
            Self::Enum8(v) => u64::from(*v),
            Self::Enum16(v) | Self::Bitmap16(v) => u64::from(*v),
            Self::Eui64(bytes) => u64::from_be_bytes(*bytes),
        }
    }
}

/// Attribute values keyed by attribute, as returned by a read
pub type AttributeMap = HashMap<ZoneAttribute, AttributeValue>;

/// Zone status bitmask; bit 0 is the primary alarm condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneStatus(pub u16);

impl ZoneStatus {
    /// Whether the primary alarm bit (bit 0) is set
    #[must_use]
    pub fn is_alarmed(self) -> bool {
        self.0 & 1 == 1
    }

    /// Normalize any attribute value into a zone status.
    ///
    /// Bitmap-like values are coerced to an integer first; only the low
    /// 16 bits are meaningful.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_value(value: AttributeValue) -> Self {
        Self(value.as_u64() as u16)
    }
}

/// IAS zone enrollment state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    /// Device has no authorized CIE
    NotEnrolled,
    /// Device is enrolled with a CIE
    Enrolled,
}

impl ZoneState {
    /// Decode a zone state from its wire value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotEnrolled),
            1 => Some(Self::Enrolled),
            _ => None,
        }
    }

    /// Wire value of this state
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::NotEnrolled => 0,
            Self::Enrolled => 1,
        }
    }
}

/// Response code of a zone enroll response command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollResponseCode {
    /// Enrollment accepted
    Success,
    /// Zone type not supported by the CIE
    NotSupported,
    /// CIE is not currently permitting enrollment
    NoEnrollPermit,
    /// CIE zone table is full
    TooManyZones,
}

impl EnrollResponseCode {
    /// Wire value of this response code
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NotSupported => 1,
            Self::NoEnrollPermit => 2,
            Self::TooManyZones => 3,
        }
    }
}

/// Inbound zone enroll request from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollRequest {
    /// Zone type the device claims
    pub zone_type: u16,
    /// Manufacturer code of the device
    pub manufacturer_code: u16,
}

/// Outbound zone enroll response to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollResponse {
    /// Acceptance code
    pub code: EnrollResponseCode,
    /// Zone id assigned to the device
    pub zone_id: u8,
}
