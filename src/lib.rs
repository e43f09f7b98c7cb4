//! zone-warden - Resilient IAS zone enrollment and alarm monitoring
//!
//! Gets a security/alarm-capable wireless sensor (motion, contact,
//! emergency) registered with its controlling hub and keeps the alarm state
//! observable afterwards, even when the device's enrollment handshake is
//! unreliable or only partially standard-compliant:
//! - Multi-strategy execution engine with caller-side retry and backoff
//! - Six-stage enrollment fallback chain ending in guaranteed-success modes
//! - Push/poll alarm normalization with a safety-net auto-reset timer
//! - Interval poll scheduler for devices that never enroll
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Owning device/platform               │
//! │        ZoneTransport  │  CapabilitySink             │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  ZoneEnroller                        │
//! │   engine  │  strategies  │  hooks  │  poll loop     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  AlarmHandler                        │
//! │   normalize  │  capability sink  │  auto-reset      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod alarm;
pub mod engine;
pub mod error;
pub mod identity;
pub mod options;
pub mod transport;
pub mod zcl;

mod enroller;
mod poll;

pub use alarm::AlarmHandler;
pub use engine::{Backoff, RetryPolicy, RunOptions, Strategy};
pub use enroller::{EnrollmentMethod, EnrollmentStatus, ZoneEnroller};
pub use error::{Error, Result};
pub use identity::{CieAddress, HubIdentity};
pub use options::EnrollmentOptions;
pub use transport::{CapabilitySink, EnrollRequestHook, StatusChangeHook, ZoneTransport};
pub use zcl::{
    AttributeMap, AttributeValue, EnrollRequest, EnrollResponse, EnrollResponseCode,
    ZoneAttribute, ZoneState, ZoneStatus,
};
