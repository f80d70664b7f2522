//! Test utilities for mtp-bridge
//!
//! Provides a scripted in-memory transport and dataset builders for testing
//! across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{MOCK_PREFIX, MockTransport};
//! use protocol::Transport;
//!
//! let mut transport = MockTransport::new().with_device("mock:cam0", "Test Camera");
//! assert_eq!(transport.device_paths().unwrap(), vec!["mock:cam0".to_string()]);
//! assert_eq!(transport.path_prefix(), MOCK_PREFIX);
//! ```

use bytes::BufMut;
use protocol::codes::response;
use protocol::{DataType, Request, Response, Transport, TransportError, TransportSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Path prefix used by [`MockTransport`]
pub const MOCK_PREFIX: &str = "mock:";

/// Friendly name the default registry allows
pub const ALLOWED_NAME: &str = "RICOH R Development Kit";

/// One recorded call into the mock transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    DevicePaths,
    FriendlyName(String),
    Open(String),
    Execute(Request),
    Close,
}

#[derive(Default)]
struct MockState {
    devices: Vec<(String, String)>,
    responses: HashMap<u16, Response>,
    interactions: Vec<Interaction>,
    open_sessions: usize,
    max_open_sessions: usize,
    fail_open: bool,
    fail_execute: bool,
    fail_close: bool,
    execute_delay: Duration,
}

/// Scripted transport double
///
/// Clones share state, so a test keeps one handle for inspection while the
/// bridge owns another. Every call is recorded, and the highest number of
/// simultaneously open sessions is tracked.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a present device
    pub fn with_device(self, path: &str, friendly_name: &str) -> Self {
        self.lock()
            .devices
            .push((path.to_string(), friendly_name.to_string()));
        self
    }

    /// Script the response to operation `code`
    pub fn with_response(self, code: u16, response: Response) -> Self {
        self.lock().responses.insert(code, response);
        self
    }

    /// Script an OK response carrying `data` for operation `code`
    pub fn with_ok(self, code: u16, data: Vec<u8>) -> Self {
        self.with_response(
            code,
            Response {
                code: response::OK,
                params: Vec::new(),
                data,
            },
        )
    }

    /// Replace the set of present devices
    pub fn set_devices(&self, devices: &[(&str, &str)]) {
        self.lock().devices = devices
            .iter()
            .map(|(p, n)| (p.to_string(), n.to_string()))
            .collect();
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_fail_execute(&self, fail: bool) {
        self.lock().fail_execute = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Hold every execute for `delay` (widens race windows)
    pub fn set_execute_delay(&self, delay: Duration) {
        self.lock().execute_delay = delay;
    }

    /// Every call recorded so far
    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().interactions.clone()
    }

    /// Requests executed so far, in order
    pub fn executed(&self) -> Vec<Request> {
        self.lock()
            .interactions
            .iter()
            .filter_map(|i| match i {
                Interaction::Execute(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }

    /// Highest number of sessions ever open at once
    pub fn max_open_sessions(&self) -> usize {
        self.lock().max_open_sessions
    }

    pub fn clear_interactions(&self) {
        self.lock().interactions.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn path_prefix(&self) -> &str {
        MOCK_PREFIX
    }

    fn device_paths(&mut self) -> Result<Vec<String>, TransportError> {
        let mut state = self.lock();
        state.interactions.push(Interaction::DevicePaths);
        Ok(state.devices.iter().map(|(p, _)| p.clone()).collect())
    }

    fn friendly_name(&mut self, path: &str) -> Option<String> {
        let mut state = self.lock();
        state
            .interactions
            .push(Interaction::FriendlyName(path.to_string()));
        state
            .devices
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, n)| n.clone())
    }

    fn open(&mut self, path: &str) -> Result<MockSession, TransportError> {
        let mut state = self.lock();
        state.interactions.push(Interaction::Open(path.to_string()));

        if state.fail_open || !state.devices.iter().any(|(p, _)| p == path) {
            return Err(TransportError::NotFound);
        }

        state.open_sessions += 1;
        state.max_open_sessions = state.max_open_sessions.max(state.open_sessions);

        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

/// Session handed out by [`MockTransport`]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransportSession for MockSession {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError> {
        let delay = {
            let mut state = self.lock();
            state.interactions.push(Interaction::Execute(request.clone()));
            state.execute_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let state = self.lock();
        if state.fail_execute {
            return Err(TransportError::Communication("mock link down".to_string()));
        }

        Ok(state
            .responses
            .get(&request.code)
            .cloned()
            .unwrap_or(Response {
                code: response::OPERATION_NOT_SUPPORTED,
                params: Vec::new(),
                data: Vec::new(),
            }))
    }

    fn close(self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.interactions.push(Interaction::Close);
        state.open_sessions = state.open_sessions.saturating_sub(1);

        if state.fail_close {
            return Err(TransportError::Communication("mock close failed".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Dataset builders
// ============================================================================

/// Append a count-prefixed wide string, NUL terminated as devices send it
pub fn put_dataset_string(buf: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    if units.is_empty() {
        buf.put_u8(0);
        return;
    }
    buf.put_u8(units.len() as u8 + 1);
    for unit in units {
        buf.put_u16_le(unit);
    }
    buf.put_u16_le(0);
}

fn put_u16_array(buf: &mut Vec<u8>, items: &[u16]) {
    buf.put_u32_le(items.len() as u32);
    for item in items {
        buf.put_u16_le(*item);
    }
}

/// Build a DeviceInfo dataset
pub fn create_device_info_dataset(manufacturer: &str, model: &str, serial: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u16_le(100); // standard version
    buf.put_u32_le(6); // vendor extension id
    buf.put_u16_le(100); // vendor extension version
    put_dataset_string(&mut buf, "microsoft.com: 1.0;");
    buf.put_u16_le(0); // functional mode
    put_u16_array(&mut buf, &[0x1001, 0x1002, 0x1003, 0x1014, 0x1015, 0x1016]);
    put_u16_array(&mut buf, &[]);
    put_u16_array(&mut buf, &[0x5005, 0x5010]);
    put_u16_array(&mut buf, &[]);
    put_u16_array(&mut buf, &[]);
    put_dataset_string(&mut buf, manufacturer);
    put_dataset_string(&mut buf, model);
    put_dataset_string(&mut buf, "1.00");
    put_dataset_string(&mut buf, serial);
    buf
}

/// Build a UINT16 DevicePropDesc dataset with an enumeration form
pub fn create_u16_enum_desc(code: u16, default: u16, current: u16, values: &[u16]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u16_le(code);
    buf.put_u16_le(DataType::UInt16.code());
    buf.put_u8(1);
    buf.put_u16_le(default);
    buf.put_u16_le(current);
    buf.put_u8(protocol::codes::form::ENUMERATION);
    buf.put_u16_le(values.len() as u16);
    for v in values {
        buf.put_u16_le(*v);
    }
    buf
}

/// Build an INT16 DevicePropDesc dataset with a range form
pub fn create_i16_range_desc(code: u16, current: i16, min: i16, max: i16, step: i16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u16_le(code);
    buf.put_u16_le(DataType::Int16.code());
    buf.put_u8(1);
    buf.put_i16_le(0);
    buf.put_i16_le(current);
    buf.put_u8(protocol::codes::form::RANGE);
    buf.put_i16_le(min);
    buf.put_i16_le(max);
    buf.put_i16_le(step);
    buf
}
