//! Protocol error types

use crate::types::DataType;
use thiserror::Error;

/// Value codec and dataset parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The data type has no codec in this direction
    #[error("Unsupported data type({:04X})", .0.code())]
    UnsupportedDataType(DataType),

    /// Textual input could not be parsed into the target type
    #[error("Invalid value({value}) for {data_type}")]
    InvalidValue { value: String, data_type: DataType },

    /// Buffer ended before the value did
    #[error("Buffer too small: needed {needed}, got {available}")]
    Truncated { needed: usize, available: usize },

    /// Numeric data type code outside the known set
    #[error("Unsupported data type({0:04X})")]
    UnknownDataType(u16),

    /// Textual data type name outside the known set
    #[error("Invalid type name({0})")]
    UnknownTypeName(String),
}

/// Errors raised by the device-control transport
///
/// These never reach a caller verbatim: the session layer folds every
/// variant into a uniform "device not found" outcome.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device path does not resolve to a present device
    #[error("Device not found")]
    NotFound,

    /// The device path or request was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Another session holds the device
    #[error("Device busy")]
    Busy,

    /// The link to the device failed mid-operation
    #[error("Communication error: {0}")]
    Communication(String),

    /// The device sent something that is not a valid container
    #[error("Malformed container: {0}")]
    Malformed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for codec results
pub type Result<T> = std::result::Result<T, CodecError>;
