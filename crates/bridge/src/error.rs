//! Bridge error types
//!
//! The `Display` text of every variant is the status string a caller sees,
//! so messages here are part of the line protocol.

use protocol::{CodecError, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Blank input line
    #[error("No commands")]
    NoCommand,

    /// First token is not a known command
    #[error("Invalid command")]
    InvalidCommand,

    /// Wrong number of arguments for the command
    #[error("Invalid parameter count({actual} for {expected})")]
    InvalidArgumentCount { expected: usize, actual: usize },

    /// Property name missing from the registry
    #[error("Invalid property key({0})")]
    UnknownProperty(String),

    /// Value could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Firmware file name does not carry a version
    #[error("Invalid file name")]
    InvalidFileName,

    /// Empty config/firmware file
    #[error("Invalid file content")]
    InvalidFileContent,

    /// Device absent, failed to open, or lost mid-operation
    #[error("Device not found")]
    DeviceNotFound,

    /// Device answered with a non-OK response code
    #[error("FAILED({0:04X})")]
    Response(u16),

    /// Transport fault; folded into `DeviceNotFound` at the session boundary
    #[error("Device not found")]
    Transport(#[from] TransportError),

    /// Local file I/O failure
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
