//! Enrollment state machine
//!
//! Sequences the fallback strategies through the execution engine until one
//! succeeds, records the winning method, arms the inbound hooks, and starts
//! the poll scheduler when polling is the active method. Polling and passive
//! modes are guaranteed-termination fallbacks, so a validly configured
//! session always ends up enrolled; handshake failures cost confidence
//! (polled instead of pushed detection), never a hard error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::alarm::AlarmHandler;
use crate::engine::{self, RunOptions, Strategy};
use crate::identity::CieAddress;
use crate::options::EnrollmentOptions;
use crate::poll;
use crate::transport::{CapabilitySink, ZoneTransport};
use crate::zcl::{
    AttributeValue, EnrollResponse, EnrollResponseCode, ZoneAttribute, ZoneState,
};
use crate::{Error, Result};

/// Settle time between the zone configuration write and its read-back
const ENROLL_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How a session ended up enrolled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentMethod {
    /// Enroll-request hook armed; responses sent on demand
    Listener,
    /// CIE address written and confirmed by read-back
    VerifiedWrite,
    /// CIE address written, optimistically assumed accepted
    UnverifiedWrite,
    /// Zone type written, device expected to self-enroll
    AutoEnroll,
    /// No handshake; zone status read on an interval
    Polling,
    /// No handshake, no polling; unsolicited reports only
    Passive,
    /// Pipeline has not completed
    None,
}

impl std::fmt::Display for EnrollmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listener => write!(f, "listener"),
            Self::VerifiedWrite => write!(f, "verified-write"),
            Self::UnverifiedWrite => write!(f, "unverified-write"),
            Self::AutoEnroll => write!(f, "auto-enroll"),
            Self::Polling => write!(f, "polling"),
            Self::Passive => write!(f, "passive"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Diagnostic snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentStatus {
    /// Whether the pipeline has completed
    pub enrolled: bool,
    /// Winning enrollment method
    pub method: EnrollmentMethod,
    /// Whether the inbound hooks are armed
    pub listeners_armed: bool,
    /// Whether the poll scheduler is running
    pub polling_active: bool,
}

/// Mutable session state, one per device
struct SessionState {
    enrolled: bool,
    method: EnrollmentMethod,
    listeners_armed: bool,
    enroll_hook_armed: bool,
    poll_handle: Option<JoinHandle<()>>,
}

struct Inner {
    options: EnrollmentOptions,
    transport: Arc<dyn ZoneTransport>,
    alarm: AlarmHandler,
    state: Mutex<SessionState>,
    pipeline_active: AtomicBool,
    torn_down: AtomicBool,
}

/// Resilient IAS zone enrollment session
///
/// One per device; created on device initialization, torn down with
/// [`shutdown`](ZoneEnroller::shutdown) on removal.
pub struct ZoneEnroller {
    inner: Arc<Inner>,
}

impl ZoneEnroller {
    /// Create a session over the device's transport and capability sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a self-contradictory configuration
    /// (both terminal fallbacks disabled, or a zero poll interval with
    /// polling enabled).
    pub fn new(
        options: EnrollmentOptions,
        transport: Arc<dyn ZoneTransport>,
        sink: Arc<dyn CapabilitySink>,
    ) -> Result<Self> {
        options.validate()?;
        let alarm = AlarmHandler::new(sink, options.capability.clone(), options.auto_reset_timeout);
        Ok(Self {
            inner: Arc::new(Inner {
                options,
                transport,
                alarm,
                state: Mutex::new(SessionState {
                    enrolled: false,
                    method: EnrollmentMethod::None,
                    listeners_armed: false,
                    enroll_hook_armed: false,
                    poll_handle: None,
                }),
                pipeline_active: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }),
        })
    }

    /// Run the enrollment pipeline to completion.
    ///
    /// Tries the strategies in priority order (listener, verified write,
    /// unverified write, auto-enroll, polling, passive), retrying whole
    /// passes per the configured policy. On success the inbound hooks are
    /// armed and, when polling won, the poll scheduler starts. Calling
    /// again after completion returns the recorded method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the session is torn down or the
    /// pipeline is already running, or the engine's failure when every
    /// pass times out.
    pub async fn enroll(&self) -> Result<EnrollmentMethod> {
        if self.inner.torn_down.load(Ordering::SeqCst) {
            return Err(Error::Config("session is torn down".to_string()));
        }
        {
            let state = lock(&self.inner.state);
            if state.enrolled {
                return Ok(state.method);
            }
        }
        if self.inner.pipeline_active.swap(true, Ordering::SeqCst) {
            return Err(Error::Config(
                "enrollment pipeline already running".to_string(),
            ));
        }

        let result = self.run_pipeline().await;
        self.inner.pipeline_active.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pipeline(&self) -> Result<EnrollmentMethod> {
        let inner = &self.inner;
        let method = engine::with_retry("enrollment", inner.options.retry, || {
            Inner::run_pass(inner)
        })
        .await?;

        {
            let mut state = lock(&inner.state);
            state.enrolled = true;
            state.method = method;
        }
        tracing::info!(method = %method, "zone enrolled");

        Inner::arm_listeners(inner);
        if method == EnrollmentMethod::Polling {
            self.start_polling();
        }
        Ok(method)
    }

    fn start_polling(&self) {
        let mut state = lock(&self.inner.state);
        if state.poll_handle.is_none() {
            state.poll_handle = Some(poll::spawn(
                Arc::clone(&self.inner.transport),
                self.inner.alarm.clone(),
                self.inner.options.poll_interval,
            ));
        }
    }

    /// Diagnostic snapshot of the session
    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        let state = lock(&self.inner.state);
        EnrollmentStatus {
            enrolled: state.enrolled,
            method: state.method,
            listeners_armed: state.listeners_armed,
            polling_active: state
                .poll_handle
                .as_ref()
                .is_some_and(|h| !h.is_finished()),
        }
    }

    /// Synchronously tear the session down.
    ///
    /// Cancels the poll scheduler and any pending auto-reset timer; hook
    /// firings and strategy completions arriving afterwards are dropped.
    pub fn shutdown(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
        if let Some(handle) = lock(&self.inner.state).poll_handle.take() {
            handle.abort();
        }
        self.inner.alarm.shutdown();
        tracing::info!("zone enrollment session torn down");
    }
}

impl Drop for ZoneEnroller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// One full pass over the strategies, in priority order
    async fn run_pass(inner: &Arc<Self>) -> Result<EnrollmentMethod> {
        let strategies = vec![
            Strategy::new("listener", Self::strategy_listener(inner)),
            Strategy::new("verified-write", inner.strategy_verified()),
            Strategy::new("unverified-write", inner.strategy_unverified()),
            Strategy::new("auto-enroll", inner.strategy_auto_enroll()),
            Strategy::new("polling", inner.strategy_polling()),
            Strategy::new("passive", inner.strategy_passive()),
        ];
        engine::run(
            "enrollment",
            strategies,
            RunOptions {
                timeout: inner.options.engine_timeout,
            },
        )
        .await
    }

    /// Strategy 1: arm the enroll-request hook.
    ///
    /// Success the instant the hook is armed, whether or not a request ever
    /// arrives. A proactive response is also sent because the device's
    /// request often races hook installation during pairing; its delivery
    /// is best-effort.
    async fn strategy_listener(inner: &Arc<Self>) -> Result<EnrollmentMethod> {
        Self::arm_enroll_hook(inner)?;

        let response = EnrollResponse {
            code: EnrollResponseCode::Success,
            zone_id: inner.options.zone_id,
        };
        if let Err(e) = inner.transport.send_enroll_response(response).await {
            tracing::debug!(error = %e, "proactive enroll response not delivered");
        }

        Ok(EnrollmentMethod::Listener)
    }

    /// Strategy 2: write the zone configuration and verify by read-back
    async fn strategy_verified(&self) -> Result<EnrollmentMethod> {
        let cie = self.cie_address()?;

        // A device already holding a non-zero CIE address is enrolled;
        // rewriting it can un-enroll some firmwares.
        if let Ok(attrs) = self
            .transport
            .read_attributes(&[ZoneAttribute::CieAddress])
            .await
        {
            if let Some(AttributeValue::Eui64(bytes)) = attrs.get(&ZoneAttribute::CieAddress) {
                let existing = CieAddress::from_bytes(*bytes);
                if !existing.is_zero() {
                    tracing::info!(cie = %existing, "device already enrolled");
                    return Ok(EnrollmentMethod::VerifiedWrite);
                }
            }
        }

        self.write_zone_config(cie).await?;
        tokio::time::sleep(ENROLL_SETTLE_DELAY).await;

        let attrs = self
            .transport
            .read_attributes(&[ZoneAttribute::ZoneState])
            .await?;
        let state = attrs
            .get(&ZoneAttribute::ZoneState)
            .and_then(|v| u8::try_from(v.as_u64()).ok())
            .and_then(ZoneState::from_u8);
        if state == Some(ZoneState::Enrolled) {
            Ok(EnrollmentMethod::VerifiedWrite)
        } else {
            Err(Error::Verification(format!(
                "zone state after write is {state:?}, expected Enrolled"
            )))
        }
    }

    /// Strategy 3: same write, optimistic success
    async fn strategy_unverified(&self) -> Result<EnrollmentMethod> {
        let cie = self.cie_address()?;
        self.write_zone_config(cie).await?;
        Ok(EnrollmentMethod::UnverifiedWrite)
    }

    /// Strategy 4: write the zone type only, rely on device self-enrollment
    async fn strategy_auto_enroll(&self) -> Result<EnrollmentMethod> {
        self.transport
            .write_attributes(&[(
                ZoneAttribute::ZoneType,
                AttributeValue::Enum16(self.options.zone_type),
            )])
            .await?;
        Ok(EnrollmentMethod::AutoEnroll)
    }

    /// Strategy 5: no handshake, read on an interval
    async fn strategy_polling(&self) -> Result<EnrollmentMethod> {
        if self.options.enable_polling {
            Ok(EnrollmentMethod::Polling)
        } else {
            Err(Error::Config("polling disabled by configuration".to_string()))
        }
    }

    /// Strategy 6: terminal fallback, unsolicited reports only
    async fn strategy_passive(&self) -> Result<EnrollmentMethod> {
        if self.options.enable_passive {
            Ok(EnrollmentMethod::Passive)
        } else {
            Err(Error::Config("passive mode disabled by configuration".to_string()))
        }
    }

    fn cie_address(&self) -> Result<CieAddress> {
        self.options
            .hub_identity
            .as_ref()
            .ok_or_else(|| Error::Config("no hub identity configured".to_string()))?
            .derive()
    }

    async fn write_zone_config(&self, cie: CieAddress) -> Result<()> {
        tracing::debug!(cie = %cie, zone_type = self.options.zone_type, "writing zone configuration");
        self.transport
            .write_attributes(&[
                (ZoneAttribute::CieAddress, AttributeValue::Eui64(cie.as_bytes())),
                (
                    ZoneAttribute::ZoneType,
                    AttributeValue::Enum16(self.options.zone_type),
                ),
            ])
            .await
    }

    /// Arm the enroll-request hook; a second call is a no-op
    fn arm_enroll_hook(inner: &Arc<Self>) -> Result<()> {
        let mut state = lock(&inner.state);
        if state.enroll_hook_armed {
            return Ok(());
        }

        let weak = Arc::downgrade(inner);
        inner.transport.set_enroll_request_hook(Box::new(move |request| {
            let Some(inner) = weak.upgrade() else { return };
            if inner.torn_down.load(Ordering::SeqCst) {
                tracing::debug!("dropping enroll request after teardown");
                return;
            }
            tracing::info!(
                zone_type = request.zone_type,
                manufacturer_code = request.manufacturer_code,
                "zone enroll request received"
            );
            let response = EnrollResponse {
                code: EnrollResponseCode::Success,
                zone_id: inner.options.zone_id,
            };
            drop(tokio::spawn(async move {
                if let Err(e) = inner.transport.send_enroll_response(response).await {
                    tracing::warn!(error = %e, "failed to send enroll response");
                }
            }));
        }))?;

        state.enroll_hook_armed = true;
        Ok(())
    }

    /// Arm both inbound hooks after any pipeline success.
    ///
    /// Unconditional but idempotent; `listeners_armed` transitions
    /// false→true at most once per session lifetime. Arming failures are
    /// logged, never propagated — the enrollment result stands.
    fn arm_listeners(inner: &Arc<Self>) {
        if let Err(e) = Self::arm_enroll_hook(inner) {
            tracing::warn!(error = %e, "enroll request hook not armed");
        }

        let mut state = lock(&inner.state);
        if state.listeners_armed {
            return;
        }

        let weak = Arc::downgrade(inner);
        let registered = inner.transport.set_status_change_hook(Box::new(move |status| {
            let Some(inner) = weak.upgrade() else { return };
            if inner.torn_down.load(Ordering::SeqCst) {
                tracing::debug!("dropping status change after teardown");
                return;
            }
            let alarm = inner.alarm.clone();
            drop(tokio::spawn(async move {
                alarm.dispatch(status).await;
            }));
        }));

        match registered {
            Ok(()) => state.listeners_armed = true,
            Err(e) => tracing::warn!(error = %e, "status change hook not armed"),
        }
    }
}
