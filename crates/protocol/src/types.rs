//! Property value and device identity types
//!
//! This module defines the data types a device property can carry, the
//! decoded value representation, and the identifiers surfaced to callers.

use crate::error::CodecError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Data type of a device property
///
/// Closed set of scalar integers (8..128 bits), their array counterparts,
/// and a wide-character string. Each variant maps to a fixed 16-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Int128,
    UInt128,
    AInt8,
    AUInt8,
    AInt16,
    AUInt16,
    AInt32,
    AUInt32,
    AInt64,
    AUInt64,
    AInt128,
    AUInt128,
    Str,
}

impl DataType {
    /// Every data type, in code order
    pub const ALL: [DataType; 21] = [
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Int128,
        DataType::UInt128,
        DataType::AInt8,
        DataType::AUInt8,
        DataType::AInt16,
        DataType::AUInt16,
        DataType::AInt32,
        DataType::AUInt32,
        DataType::AInt64,
        DataType::AUInt64,
        DataType::AInt128,
        DataType::AUInt128,
        DataType::Str,
    ];

    /// 16-bit type code as carried in datasets
    pub fn code(self) -> u16 {
        match self {
            DataType::Int8 => 0x0001,
            DataType::UInt8 => 0x0002,
            DataType::Int16 => 0x0003,
            DataType::UInt16 => 0x0004,
            DataType::Int32 => 0x0005,
            DataType::UInt32 => 0x0006,
            DataType::Int64 => 0x0007,
            DataType::UInt64 => 0x0008,
            DataType::Int128 => 0x0009,
            DataType::UInt128 => 0x000A,
            DataType::AInt8 => 0x4001,
            DataType::AUInt8 => 0x4002,
            DataType::AInt16 => 0x4003,
            DataType::AUInt16 => 0x4004,
            DataType::AInt32 => 0x4005,
            DataType::AUInt32 => 0x4006,
            DataType::AInt64 => 0x4007,
            DataType::AUInt64 => 0x4008,
            DataType::AInt128 => 0x4009,
            DataType::AUInt128 => 0x400A,
            DataType::Str => 0xFFFF,
        }
    }

    /// Look up a data type by its 16-bit code
    pub fn from_code(code: u16) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(CodecError::UnknownDataType(code))
    }

    /// Textual spelling used in registry documents
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int8 => "INT8",
            DataType::UInt8 => "UINT8",
            DataType::Int16 => "INT16",
            DataType::UInt16 => "UINT16",
            DataType::Int32 => "INT32",
            DataType::UInt32 => "UINT32",
            DataType::Int64 => "INT64",
            DataType::UInt64 => "UINT64",
            DataType::Int128 => "INT128",
            DataType::UInt128 => "UINT128",
            DataType::AInt8 => "AINT8",
            DataType::AUInt8 => "AUINT8",
            DataType::AInt16 => "AINT16",
            DataType::AUInt16 => "AUINT16",
            DataType::AInt32 => "AINT32",
            DataType::AUInt32 => "AUINT32",
            DataType::AInt64 => "AINT64",
            DataType::AUInt64 => "AUINT64",
            DataType::AInt128 => "AINT128",
            DataType::AUInt128 => "AUINT128",
            DataType::Str => "STR",
        }
    }

    /// Byte width of a fixed-size scalar, `None` for arrays and strings
    pub fn scalar_width(self) -> Option<usize> {
        match self {
            DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 => Some(2),
            DataType::Int32 | DataType::UInt32 => Some(4),
            DataType::Int64 | DataType::UInt64 => Some(8),
            DataType::Int128 | DataType::UInt128 => Some(16),
            _ => None,
        }
    }

    /// Whether this is one of the array variants
    pub fn is_array(self) -> bool {
        self.code() & 0x4000 != 0 && self != DataType::Str
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| CodecError::UnknownTypeName(s.to_string()))
    }
}

/// A decoded property value
///
/// Serializes as a bare JSON number, string, or array of numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Str(String),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::UInt16Array(v) => write!(f, "{:?}", v),
            Value::UInt32Array(v) => write!(f, "{:?}", v),
        }
    }
}

/// Caller-facing device identifier
///
/// Always stored without the transport's path prefix; the prefix is added
/// back only at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Build an id from a raw transport path, stripping `prefix`
    ///
    /// Paths that do not carry the prefix are surfaced unchanged.
    pub fn from_path(path: &str, prefix: &str) -> Self {
        DeviceId(path.strip_prefix(prefix).unwrap_or(path).to_string())
    }

    /// Re-attach the transport's path prefix
    pub fn to_path(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId(s.to_string())
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Kind of bulk object moved by the config transfer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Config = 1,
    Firmware = 2,
}

/// Scalar parameters of a config-object transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigObjectHeader {
    pub object_type: ObjectType,
    pub length: u32,
    /// Always 0 for config objects; parsed from the file name for firmware
    pub version: u32,
}

impl ConfigObjectHeader {
    /// Operation parameters in wire order
    pub fn params(&self) -> Vec<u32> {
        vec![self.object_type as u32, self.length, self.version]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_code_round_trip() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_code(t.code()).unwrap(), t);
            assert_eq!(t.name().parse::<DataType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_type_name() {
        assert_eq!(
            "FLOAT".parse::<DataType>(),
            Err(CodecError::UnknownTypeName("FLOAT".to_string()))
        );
        // Names are case-sensitive
        assert!("uint16".parse::<DataType>().is_err());
    }

    #[test]
    fn test_is_array() {
        assert!(DataType::AUInt16.is_array());
        assert!(DataType::AInt128.is_array());
        assert!(!DataType::UInt16.is_array());
        assert!(!DataType::Str.is_array());
    }

    #[test]
    fn test_device_id_prefix() {
        let id = DeviceId::from_path("usb:001:004", "usb:");
        assert_eq!(id.as_str(), "001:004");
        assert_eq!(id.to_path("usb:"), "usb:001:004");

        let bare = DeviceId::from_path("001:004", "usb:");
        assert_eq!(bare.as_str(), "001:004");
    }

    #[test]
    fn test_value_serialization() {
        assert_eq!(serde_json::to_string(&Value::Int16(-3)).unwrap(), "-3");
        assert_eq!(
            serde_json::to_string(&Value::Str("abc".into())).unwrap(),
            "\"abc\""
        );
        assert_eq!(
            serde_json::to_string(&Value::UInt16Array(vec![1, 2])).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn test_config_object_params() {
        let header = ConfigObjectHeader {
            object_type: ObjectType::Firmware,
            length: 1024,
            version: 2,
        };
        assert_eq!(header.params(), vec![2, 1024, 2]);
    }
}
