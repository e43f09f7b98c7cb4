//! Alarm notification and auto-reset handling
//!
//! Push notifications and polled snapshots both funnel through
//! [`AlarmHandler::dispatch`], which normalizes the zone status to a boolean
//! and drives the capability sink. Setting the alarm also arms a single-shot
//! safety-net timer that force-clears the capability for devices that never
//! send an explicit "cleared" notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::transport::CapabilitySink;
use crate::zcl::ZoneStatus;

/// Normalize-and-dispatch funnel for zone status events
#[derive(Clone)]
pub struct AlarmHandler {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn CapabilitySink>,
    capability: String,
    auto_reset_timeout: Duration,
    /// Pending safety-net timer; at most one live at a time
    reset_handle: Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

impl AlarmHandler {
    /// Create a handler driving `capability` on `sink`.
    ///
    /// A zero `auto_reset_timeout` disables the safety-net reset.
    #[must_use]
    pub fn new(sink: Arc<dyn CapabilitySink>, capability: String, auto_reset_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                capability,
                auto_reset_timeout,
                reset_handle: Mutex::new(None),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    /// Normalize a zone status and drive the capability sink.
    ///
    /// Safe to re-enter from interleaved push and poll events; the only
    /// shared mutable state is the reset-timer slot, swapped under a lock
    /// without awaiting. Dispatches after teardown are dropped.
    pub async fn dispatch(&self, status: ZoneStatus) {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            tracing::debug!(status = status.0, "dropping zone status after teardown");
            return;
        }

        let alarmed = status.is_alarmed();
        tracing::debug!(
            status = status.0,
            alarmed,
            capability = %self.inner.capability,
            "zone status dispatched"
        );

        if !self.inner.sink.has_capability(&self.inner.capability) {
            tracing::debug!(
                capability = %self.inner.capability,
                "capability not present on device, skipping"
            );
            return;
        }

        if alarmed {
            if let Err(e) = self.inner.sink.set_capability(&self.inner.capability, true).await {
                tracing::warn!(capability = %self.inner.capability, error = %e, "failed to set alarm");
            }
            self.schedule_reset();
        } else {
            self.cancel_reset();
            if let Err(e) = self.inner.sink.set_capability(&self.inner.capability, false).await {
                tracing::warn!(capability = %self.inner.capability, error = %e, "failed to clear alarm");
            }
        }
    }

    /// Arm the safety-net reset, replacing any pending timer
    fn schedule_reset(&self) {
        if self.inner.auto_reset_timeout.is_zero() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let mut slot = self.inner.reset_handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(old) = slot.take() {
            old.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.auto_reset_timeout).await;
            if inner.torn_down.load(Ordering::SeqCst) {
                return;
            }
            tracing::info!(capability = %inner.capability, "auto-reset fired, clearing alarm");
            if let Err(e) = inner.sink.set_capability(&inner.capability, false).await {
                tracing::warn!(capability = %inner.capability, error = %e, "auto-reset failed");
            }
        }));
    }

    /// Cancel any pending safety-net reset
    fn cancel_reset(&self) {
        let mut slot = self.inner.reset_handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// Whether a safety-net reset is currently pending
    #[must_use]
    pub fn reset_pending(&self) -> bool {
        self.inner
            .reset_handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Synchronously tear the handler down.
    ///
    /// Cancels any pending reset timer and drops all later dispatches.
    pub fn shutdown(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        self.cancel_reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;

    use super::*;
    use crate::Result;

    /// Capability sink that records the last written value
    struct RecordingSink {
        present: bool,
        value: Mutex<Option<bool>>,
        writes: AtomicU32,
    }

    impl RecordingSink {
        fn new(present: bool) -> Arc<Self> {
            Arc::new(Self {
                present,
                value: Mutex::new(None),
                writes: AtomicU32::new(0),
            })
        }

        fn value(&self) -> Option<bool> {
            *self.value.lock().unwrap()
        }
    }

    #[async_trait]
    impl CapabilitySink for RecordingSink {
        fn has_capability(&self, name: &str) -> bool {
            self.present && name == "alarm_motion"
        }

        async fn set_capability(&self, _name: &str, value: bool) -> Result<()> {
            *self.value.lock().unwrap() = Some(value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn handler(sink: &Arc<RecordingSink>, reset: Duration) -> AlarmHandler {
        AlarmHandler::new(sink.clone(), "alarm_motion".to_string(), reset)
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_set_then_auto_reset_fires() {
        let sink = RecordingSink::new(true);
        let alarm = handler(&sink, Duration::from_secs(60));

        alarm.dispatch(ZoneStatus(1)).await;
        assert_eq!(sink.value(), Some(true));
        assert!(alarm.reset_pending());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(sink.value(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn new_alarm_replaces_pending_timer() {
        let sink = RecordingSink::new(true);
        let alarm = handler(&sink, Duration::from_secs(60));

        alarm.dispatch(ZoneStatus(1)).await;
        tokio::time::sleep(Duration::from_secs(40)).await;
        alarm.dispatch(ZoneStatus(1)).await;

        // The first timer would have fired at t=60; the replacement pushed
        // the reset out to t=100.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sink.value(), Some(true));

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(sink.value(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_clear_cancels_timer() {
        let sink = RecordingSink::new(true);
        let alarm = handler(&sink, Duration::from_secs(60));

        alarm.dispatch(ZoneStatus(1)).await;
        alarm.dispatch(ZoneStatus(0)).await;
        assert_eq!(sink.value(), Some(false));
        assert!(!alarm.reset_pending());

        let writes_before = sink.writes.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.writes.load(Ordering::SeqCst), writes_before);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_disables_auto_reset() {
        let sink = RecordingSink::new(true);
        let alarm = handler(&sink, Duration::ZERO);

        alarm.dispatch(ZoneStatus(1)).await;
        assert!(!alarm.reset_pending());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(sink.value(), Some(true));
    }

    #[tokio::test]
    async fn missing_capability_is_skipped() {
        let sink = RecordingSink::new(false);
        let alarm = handler(&sink, Duration::from_secs(60));

        alarm.dispatch(ZoneStatus(1)).await;
        assert_eq!(sink.value(), None);
        assert!(!alarm.reset_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_after_shutdown_is_dropped() {
        let sink = RecordingSink::new(true);
        let alarm = handler(&sink, Duration::from_secs(60));

        alarm.dispatch(ZoneStatus(1)).await;
        alarm.shutdown();
        alarm.dispatch(ZoneStatus(0)).await;

        // Set once, then nothing: the clear was dropped and the aborted
        // timer never fires.
        assert_eq!(sink.value(), Some(true));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.writes.load(Ordering::SeqCst), 1);
    }
}
