//! Enrollment configuration

use std::time::Duration;

use crate::engine::RetryPolicy;
use crate::identity::HubIdentity;
use crate::zcl::ZONE_TYPE_MOTION;
use crate::{Error, Result};

/// Immutable enrollment configuration, supplied by the owning device at
/// construction
#[derive(Debug, Clone)]
pub struct EnrollmentOptions {
    /// IAS zone type code (motion, contact, emergency, ...)
    pub zone_type: u16,

    /// Zone id assigned to the device in enroll responses
    pub zone_id: u8,

    /// Name of the boolean alarm capability to drive (e.g. `alarm_motion`)
    pub capability: String,

    /// Hub identity for CIE-address writes; without it the write strategies
    /// fail with a configuration error and the pipeline falls through
    pub hub_identity: Option<HubIdentity>,

    /// Interval between zone status reads in polling mode
    pub poll_interval: Duration,

    /// Safety-net delay after which a set alarm is force-cleared;
    /// `Duration::ZERO` disables the auto-reset
    pub auto_reset_timeout: Duration,

    /// Whether polling mode is an acceptable fallback
    pub enable_polling: bool,

    /// Whether passive mode is an acceptable terminal fallback
    pub enable_passive: bool,

    /// Deadline for one full pass over the enrollment strategies
    pub engine_timeout: Option<Duration>,

    /// Retry policy applied around whole enrollment passes
    pub retry: RetryPolicy,
}

impl Default for EnrollmentOptions {
    fn default() -> Self {
        Self {
            zone_type: ZONE_TYPE_MOTION,
            zone_id: 10,
            capability: "alarm_motion".to_string(),
            hub_identity: None,
            poll_interval: Duration::from_secs(60),
            auto_reset_timeout: Duration::from_secs(60),
            enable_polling: true,
            enable_passive: true,
            engine_timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
        }
    }
}

impl EnrollmentOptions {
    /// Reject self-contradictory configurations.
    ///
    /// Polling and passive modes are the guaranteed-termination fallbacks;
    /// with both disabled the pipeline could hard-fail, so that combination
    /// is refused up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when both terminal fallbacks are disabled
    /// or the poll interval is zero while polling is enabled.
    pub fn validate(&self) -> Result<()> {
        if !self.enable_polling && !self.enable_passive {
            return Err(Error::Config(
                "polling and passive modes both disabled; no viable enrollment fallback"
                    .to_string(),
            ));
        }
        if self.enable_polling && self.poll_interval.is_zero() {
            return Err(Error::Config(
                "poll interval must be non-zero when polling is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
