//! USB bulk container framing
//!
//! Every command, data and response phase travels over the bulk pipes in a
//! container:
//! ```text
//! [Length: u32][Kind: u16][Code: u16][Transaction: u32][Payload...]
//! ```
//! All fields are little-endian and `Length` covers the header itself.
//! Command and response payloads are up to five u32 parameters.

use crate::codes::container;
use crate::error::TransportError;
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};

/// Size of the fixed container header
pub const HEADER_LEN: usize = 12;

/// Maximum number of parameters in a command or response container
pub const MAX_PARAMS: usize = 5;

/// Container kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Command,
    Data,
    Response,
    Event,
}

impl ContainerKind {
    fn code(self) -> u16 {
        match self {
            ContainerKind::Command => container::COMMAND,
            ContainerKind::Data => container::DATA,
            ContainerKind::Response => container::RESPONSE,
            ContainerKind::Event => container::EVENT,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        match code {
            container::COMMAND => Some(ContainerKind::Command),
            container::DATA => Some(ContainerKind::Data),
            container::RESPONSE => Some(ContainerKind::Response),
            container::EVENT => Some(ContainerKind::Event),
            _ => None,
        }
    }
}

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Total container length including the header
    pub length: u32,
    pub kind: ContainerKind,
    pub code: u16,
    pub transaction_id: u32,
}

impl ContainerHeader {
    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_LEN)
    }
}

/// Build a command container carrying `params`
pub fn encode_command(code: u16, transaction_id: u32, params: &[u32]) -> Result<BytesMut, TransportError> {
    if params.len() > MAX_PARAMS {
        return Err(TransportError::InvalidArgument(format!(
            "{} parameters (max: {})",
            params.len(),
            MAX_PARAMS
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + params.len() * 4);
    put_header(&mut buf, ContainerKind::Command, code, transaction_id, params.len() * 4);
    for param in params {
        buf.put_u32_le(*param);
    }
    Ok(buf)
}

/// Build a data container around `payload`
pub fn encode_data(code: u16, transaction_id: u32, payload: &[u8]) -> Result<BytesMut, TransportError> {
    if payload.len() > u32::MAX as usize - HEADER_LEN {
        return Err(TransportError::InvalidArgument(format!(
            "payload of {} bytes exceeds container limit",
            payload.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    put_header(&mut buf, ContainerKind::Data, code, transaction_id, payload.len());
    buf.put_slice(payload);
    Ok(buf)
}

/// Parse the header at the start of `bytes`
pub fn decode_header(bytes: &[u8]) -> Result<ContainerHeader, TransportError> {
    if bytes.len() < HEADER_LEN {
        return Err(TransportError::Malformed(format!(
            "container header needs {} bytes, got {}",
            HEADER_LEN,
            bytes.len()
        )));
    }

    let mut reader = bytes;
    let length = reader.read_u32::<LittleEndian>()?;
    let kind_code = reader.read_u16::<LittleEndian>()?;
    let code = reader.read_u16::<LittleEndian>()?;
    let transaction_id = reader.read_u32::<LittleEndian>()?;

    if (length as usize) < HEADER_LEN {
        return Err(TransportError::Malformed(format!(
            "container length {} shorter than header",
            length
        )));
    }
    let kind = ContainerKind::from_code(kind_code).ok_or_else(|| {
        TransportError::Malformed(format!("unknown container kind {:#06x}", kind_code))
    })?;

    Ok(ContainerHeader {
        length,
        kind,
        code,
        transaction_id,
    })
}

/// Parse the parameters of a response container payload
pub fn decode_params(payload: &[u8]) -> Vec<u32> {
    payload
        .chunks_exact(4)
        .take(MAX_PARAMS)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn put_header(buf: &mut BytesMut, kind: ContainerKind, code: u16, transaction_id: u32, payload_len: usize) {
    buf.put_u32_le((HEADER_LEN + payload_len) as u32);
    buf.put_u16_le(kind.code());
    buf.put_u16_le(code);
    buf.put_u32_le(transaction_id);
}
