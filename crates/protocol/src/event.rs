//! Device event notices
//!
//! Devices push events in event containers, either on the interrupt pipe
//! or interleaved on the bulk pipe. Each one is reported as a single text
//! line.

use crate::codes::event;
use crate::container::{ContainerHeader, ContainerKind, HEADER_LEN, decode_header, decode_params};
use crate::error::TransportError;
use std::fmt;

/// One event pushed by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNotice {
    pub code: u16,
    pub params: Vec<u32>,
}

impl DeviceNotice {
    pub fn new(code: u16, params: Vec<u32>) -> Self {
        Self { code, params }
    }

    /// Build a notice from an already split event container
    pub fn from_container(header: &ContainerHeader, payload: &[u8]) -> Self {
        Self::new(header.code, decode_params(payload))
    }

    /// Parse a complete event container, as read from the interrupt pipe
    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        let header = decode_header(bytes)?;
        if header.kind != ContainerKind::Event {
            return Err(TransportError::Malformed(format!(
                "expected an event container, got {:?}",
                header.kind
            )));
        }
        let end = (header.length as usize).min(bytes.len());
        Ok(Self::from_container(&header, &bytes[HEADER_LEN..end]))
    }
}

impl fmt::Display for DeviceNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            event::OBJECT_ADDED => write!(
                f,
                "ObjectAdded. ObjectID: {:X}",
                self.params.first().copied().unwrap_or_default()
            ),
            event::DEVICE_PROP_CHANGED => f.write_str("DevicePropChanged."),
            event::DEVICE_INFO_CHANGED => f.write_str("DeviceInfoChanged."),
            event::STORE_FULL => f.write_str("StoreFull."),
            event::STORAGE_INFO_CHANGED => f.write_str("StorageInfoChanged."),
            event::CAPTURE_COMPLETE => f.write_str("CaptureComplete."),
            code => write!(f, "Unknown Event({:04X})", code),
        }
    }
}
