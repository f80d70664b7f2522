//! Protocol library for mtp-bridge
//!
//! This crate defines everything that touches bytes: the property data
//! types and their value codec, the DeviceInfo / DevicePropDesc datasets,
//! USB container framing, and the transport traits the bridge drives.
//!
//! # Example
//!
//! ```
//! use protocol::{DataType, Value, decode_value, encode_value};
//!
//! let bytes = encode_value("5", DataType::UInt16).unwrap();
//! assert_eq!(bytes, vec![5, 0]);
//!
//! let value = decode_value(&bytes, DataType::UInt16).unwrap();
//! assert_eq!(value, Value::UInt16(5));
//! ```

pub mod codec;
pub mod codes;
pub mod container;
pub mod dataset;
pub mod error;
pub mod event;
pub mod transport;
pub mod types;

pub use codec::{decode_value, encode_value, read_value};
pub use dataset::{DeviceInfo, DevicePropDesc, PropForm};
pub use error::{CodecError, Result, TransportError};
pub use event::DeviceNotice;
pub use transport::{DataPhase, Request, Response, Transport, TransportSession};
pub use types::{ConfigObjectHeader, DataType, DeviceId, ObjectType, Value};
