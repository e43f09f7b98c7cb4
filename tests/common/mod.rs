//! Shared mocks for integration tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use zone_warden::{
    AttributeMap, AttributeValue, CapabilitySink, EnrollRequest, EnrollRequestHook,
    EnrollResponse, Error, Result, StatusChangeHook, ZoneAttribute, ZoneStatus, ZoneTransport,
};

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scriptable zone transport with single-slot hooks
#[derive(Default)]
pub struct MockTransport {
    /// Fail all attribute writes with a transport error
    pub fail_writes: AtomicBool,
    /// Fail all attribute reads with a transport error
    pub fail_reads: AtomicBool,
    /// Fail enroll-request hook registration (cluster unreachable)
    pub fail_enroll_hook: AtomicBool,
    /// Fail status-change hook registration
    pub fail_status_hook: AtomicBool,

    zone_state: Mutex<u8>,
    cie_address: Mutex<[u8; 8]>,
    zone_status: Mutex<u16>,

    writes: Mutex<Vec<Vec<(ZoneAttribute, AttributeValue)>>>,
    responses: Mutex<Vec<EnrollResponse>>,
    status_reads: AtomicU32,
    enroll_hook_sets: AtomicU32,
    status_hook_sets: AtomicU32,

    enroll_hook: Mutex<Option<EnrollRequestHook>>,
    status_hook: Mutex<Option<StatusChangeHook>>,
}

impl MockTransport {
    /// Zone state returned by reads (1 = enrolled)
    pub fn set_zone_state(&self, state: u8) {
        *self.zone_state.lock().unwrap() = state;
    }

    /// CIE address returned by reads (non-zero means already enrolled)
    pub fn set_cie_address(&self, address: [u8; 8]) {
        *self.cie_address.lock().unwrap() = address;
    }

    /// Zone status bitmask returned by reads
    pub fn set_zone_status(&self, status: u16) {
        *self.zone_status.lock().unwrap() = status;
    }

    /// Fire the enroll-request hook, if armed
    pub fn fire_enroll_request(&self, request: EnrollRequest) -> bool {
        match self.enroll_hook.lock().unwrap().as_ref() {
            Some(hook) => {
                hook(request);
                true
            }
            None => false,
        }
    }

    /// Fire the status-change hook, if armed
    pub fn fire_status_change(&self, status: u16) -> bool {
        match self.status_hook.lock().unwrap().as_ref() {
            Some(hook) => {
                hook(ZoneStatus(status));
                true
            }
            None => false,
        }
    }

    /// Enroll responses sent so far
    pub fn sent_responses(&self) -> Vec<EnrollResponse> {
        self.responses.lock().unwrap().clone()
    }

    /// All write batches issued so far
    pub fn write_batches(&self) -> Vec<Vec<(ZoneAttribute, AttributeValue)>> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of reads that asked for the zone status
    pub fn status_reads(&self) -> u32 {
        self.status_reads.load(Ordering::SeqCst)
    }

    /// Times the enroll-request hook slot was assigned
    pub fn enroll_hook_sets(&self) -> u32 {
        self.enroll_hook_sets.load(Ordering::SeqCst)
    }

    /// Times the status-change hook slot was assigned
    pub fn status_hook_sets(&self) -> u32 {
        self.status_hook_sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZoneTransport for MockTransport {
    async fn write_attributes(&self, writes: &[(ZoneAttribute, AttributeValue)]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Transport("write rejected".to_string()));
        }
        self.writes.lock().unwrap().push(writes.to_vec());
        Ok(())
    }

    async fn read_attributes(&self, attributes: &[ZoneAttribute]) -> Result<AttributeMap> {
        if attributes.contains(&ZoneAttribute::ZoneStatus) {
            self.status_reads.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Transport("read rejected".to_string()));
        }
        let mut map = AttributeMap::new();
        for attribute in attributes {
            let value = match attribute {
                ZoneAttribute::CieAddress => {
                    AttributeValue::Eui64(*self.cie_address.lock().unwrap())
                }
                ZoneAttribute::ZoneState => {
                    AttributeValue::Enum8(*self.zone_state.lock().unwrap())
                }
                ZoneAttribute::ZoneStatus => {
                    AttributeValue::Bitmap16(*self.zone_status.lock().unwrap())
                }
                ZoneAttribute::ZoneType | ZoneAttribute::ZoneId => AttributeValue::Enum16(0),
            };
            map.insert(*attribute, value);
        }
        Ok(map)
    }

    async fn send_enroll_response(&self, response: EnrollResponse) -> Result<()> {
        self.responses.lock().unwrap().push(response);
        Ok(())
    }

    fn set_enroll_request_hook(&self, hook: EnrollRequestHook) -> Result<()> {
        if self.fail_enroll_hook.load(Ordering::SeqCst) {
            return Err(Error::Transport("zone cluster unreachable".to_string()));
        }
        self.enroll_hook_sets.fetch_add(1, Ordering::SeqCst);
        *self.enroll_hook.lock().unwrap() = Some(hook);
        Ok(())
    }

    fn set_status_change_hook(&self, hook: StatusChangeHook) -> Result<()> {
        if self.fail_status_hook.load(Ordering::SeqCst) {
            return Err(Error::Transport("zone cluster unreachable".to_string()));
        }
        self.status_hook_sets.fetch_add(1, Ordering::SeqCst);
        *self.status_hook.lock().unwrap() = Some(hook);
        Ok(())
    }
}

/// Capability sink that records every write
pub struct MockSink {
    present: bool,
    values: Mutex<Vec<bool>>,
}

impl MockSink {
    pub fn new(present: bool) -> Self {
        Self {
            present,
            values: Mutex::new(Vec::new()),
        }
    }

    /// Most recent capability value, if any was written
    pub fn last_value(&self) -> Option<bool> {
        self.values.lock().unwrap().last().copied()
    }

    /// Number of capability writes
    pub fn write_count(&self) -> usize {
        self.values.lock().unwrap().len()
    }
}

#[async_trait]
impl CapabilitySink for MockSink {
    fn has_capability(&self, _name: &str) -> bool {
        self.present
    }

    async fn set_capability(&self, _name: &str, value: bool) -> Result<()> {
        self.values.lock().unwrap().push(value);
        Ok(())
    }
}
