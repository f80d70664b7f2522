//! Device-control transport abstraction
//!
//! The bridge never talks to hardware directly. It enumerates devices,
//! opens sessions and executes operations through these traits, which the
//! libusb backend implements for real devices and test doubles implement
//! for everything else.

use crate::codes::response;
use crate::error::TransportError;

/// Direction and content of an operation's data phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataPhase {
    /// No data phase
    None,
    /// Host-to-device payload
    Write(Vec<u8>),
    /// Device-to-host payload expected
    Read,
}

/// A single protocol operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub code: u16,
    pub params: Vec<u32>,
    pub data: DataPhase,
}

impl Request {
    /// Operation with parameters and no data phase
    pub fn new(code: u16, params: Vec<u32>) -> Self {
        Self {
            code,
            params,
            data: DataPhase::None,
        }
    }

    /// Operation that reads a payload from the device
    pub fn read(code: u16, params: Vec<u32>) -> Self {
        Self {
            code,
            params,
            data: DataPhase::Read,
        }
    }

    /// Operation that writes `payload` to the device
    pub fn write(code: u16, params: Vec<u32>, payload: Vec<u8>) -> Self {
        Self {
            code,
            params,
            data: DataPhase::Write(payload),
        }
    }
}

/// Device response to an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub params: Vec<u32>,
    /// Data phase payload (empty unless the request read data)
    pub data: Vec<u8>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.code == response::OK
    }
}

/// Device enumeration and session factory
///
/// Device paths carry the transport's [`path_prefix`](Transport::path_prefix).
pub trait Transport: Send {
    type Session: TransportSession;

    /// Prefix carried by every raw device path
    fn path_prefix(&self) -> &str;

    /// Raw paths of every device the transport can see
    fn device_paths(&mut self) -> Result<Vec<String>, TransportError>;

    /// Human-readable model label of a device, if it can be read
    fn friendly_name(&mut self, path: &str) -> Option<String>;

    /// Open a session to the device at `path`
    fn open(&mut self, path: &str) -> Result<Self::Session, TransportError>;
}

/// An open device session
///
/// Operations are synchronous and block until the device answers.
pub trait TransportSession {
    fn execute(&mut self, request: &Request) -> Result<Response, TransportError>;

    /// Close the session
    ///
    /// The session is consumed even when closing fails; a broken session
    /// is never reused.
    fn close(self) -> Result<(), TransportError>;
}
