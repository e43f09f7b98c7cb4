//! Zone status poll scheduler
//!
//! Active only when polling won the enrollment pipeline. Reads the zone
//! status attribute on a fixed interval and feeds each snapshot into the
//! alarm handler. Read failures never stop the schedule; the loop runs
//! until the owning session aborts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::alarm::AlarmHandler;
use crate::transport::ZoneTransport;
use crate::zcl::{ZoneAttribute, ZoneStatus};

/// Spawn the recurring zone status poll.
///
/// The returned handle is the only way to stop the loop; the caller owns it
/// and aborts it on teardown.
pub(crate) fn spawn(
    transport: Arc<dyn ZoneTransport>,
    alarm: AlarmHandler,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!(interval_ms = interval.as_millis(), "starting zone status polling");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // read happens one interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match transport.read_attributes(&[ZoneAttribute::ZoneStatus]).await {
                Ok(attrs) => {
                    if let Some(value) = attrs.get(&ZoneAttribute::ZoneStatus) {
                        alarm.dispatch(ZoneStatus::from_value(*value)).await;
                    } else {
                        tracing::debug!("poll read returned no zone status");
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "zone status poll failed");
                }
            }
        }
    })
}
