//! Outbound interfaces to the device platform
//!
//! The enrollment subsystem never sees a whole device object. It depends on
//! exactly two narrow seams, injected at construction: a [`ZoneTransport`]
//! for the IAS zone cluster and a [`CapabilitySink`] for the platform-facing
//! alarm flag. Both are object-safe so embedders and tests can supply their
//! own implementations.

use async_trait::async_trait;

use crate::Result;
use crate::zcl::{AttributeMap, AttributeValue, EnrollRequest, EnrollResponse, ZoneAttribute, ZoneStatus};

/// Handler for inbound zone enroll requests.
///
/// Single owned slot per transport; last registration wins.
pub type EnrollRequestHook = Box<dyn Fn(EnrollRequest) + Send + Sync>;

/// Handler for inbound zone status change notifications and status
/// attribute reports.
///
/// Single owned slot per transport; last registration wins.
pub type StatusChangeHook = Box<dyn Fn(ZoneStatus) + Send + Sync>;

/// IAS zone cluster transport on the device's radio link
#[async_trait]
pub trait ZoneTransport: Send + Sync {
    /// Write zone cluster attributes on the device
    async fn write_attributes(&self, writes: &[(ZoneAttribute, AttributeValue)]) -> Result<()>;

    /// Read zone cluster attributes from the device
    async fn read_attributes(&self, attributes: &[ZoneAttribute]) -> Result<AttributeMap>;

    /// Send a zone enroll response command to the device
    async fn send_enroll_response(&self, response: EnrollResponse) -> Result<()>;

    /// Install the enroll-request hook, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when the zone
    /// cluster is not reachable (node not ready, cluster absent).
    fn set_enroll_request_hook(&self, hook: EnrollRequestHook) -> Result<()>;

    /// Install the status-change hook, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when the zone
    /// cluster is not reachable.
    fn set_status_change_hook(&self, hook: StatusChangeHook) -> Result<()>;
}

/// Platform-facing capability store of the owning device
#[async_trait]
pub trait CapabilitySink: Send + Sync {
    /// Whether the device exposes the named capability
    fn has_capability(&self, name: &str) -> bool;

    /// Set a boolean capability value
    async fn set_capability(&self, name: &str, value: bool) -> Result<()>;
}
