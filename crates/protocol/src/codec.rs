//! Typed value codec
//!
//! Converts between property values and the byte payloads carried by
//! GetDevicePropValue / SetDevicePropValue and the property datasets.
//!
//! # Encoding
//!
//! ```text
//! INT8..UINT64   fixed width, little-endian (two's complement when signed)
//! STR            [count: u8][count x UTF-16LE code units]
//! AUINT16/32     [count: u32][count x fixed-width element]
//! ```
//!
//! Decode supports the scalar types up to 64 bits, STR, AUINT16 and
//! AUINT32. Encode supports the scalar types up to 64 bits and STR. The
//! 128-bit types and every other array type are rejected with
//! [`CodecError::UnsupportedDataType`]. Array writes are a known gap: no
//! supported device takes array-typed property writes.

use crate::error::{CodecError, Result};
use crate::types::{DataType, Value};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::BufMut;
use std::str::FromStr;

/// Decode a value of `data_type` from the start of `bytes`
///
/// Trailing bytes beyond the value are ignored.
///
/// # Example
/// ```
/// use protocol::{DataType, Value, decode_value};
///
/// let value = decode_value(&[0xFE, 0xFF], DataType::Int16).unwrap();
/// assert_eq!(value, Value::Int16(-2));
/// ```
pub fn decode_value(bytes: &[u8], data_type: DataType) -> Result<Value> {
    let mut reader = bytes;
    read_value(&mut reader, data_type)
}

/// Decode a value of `data_type`, advancing `reader` past it
pub fn read_value(reader: &mut &[u8], data_type: DataType) -> Result<Value> {
    if !is_decodable(data_type) {
        return Err(CodecError::UnsupportedDataType(data_type));
    }
    if let Some(width) = data_type.scalar_width() {
        ensure_available(reader, width)?;
    }

    let value = match data_type {
        DataType::Int8 => Value::Int8(reader.read_i8().map_err(|_| truncated(1, 0))?),
        DataType::UInt8 => Value::UInt8(reader.read_u8().map_err(|_| truncated(1, 0))?),
        DataType::Int16 => Value::Int16(read_fixed(reader, 2, |r| r.read_i16::<LittleEndian>())?),
        DataType::UInt16 => {
            Value::UInt16(read_fixed(reader, 2, |r| r.read_u16::<LittleEndian>())?)
        }
        DataType::Int32 => Value::Int32(read_fixed(reader, 4, |r| r.read_i32::<LittleEndian>())?),
        DataType::UInt32 => {
            Value::UInt32(read_fixed(reader, 4, |r| r.read_u32::<LittleEndian>())?)
        }
        DataType::Int64 => Value::Int64(read_fixed(reader, 8, |r| r.read_i64::<LittleEndian>())?),
        DataType::UInt64 => {
            Value::UInt64(read_fixed(reader, 8, |r| r.read_u64::<LittleEndian>())?)
        }
        DataType::Str => Value::Str(read_string(reader)?),
        DataType::AUInt16 => Value::UInt16Array(read_array(reader, 2, |r| {
            r.read_u16::<LittleEndian>()
        })?),
        DataType::AUInt32 => Value::UInt32Array(read_array(reader, 4, |r| {
            r.read_u32::<LittleEndian>()
        })?),
        other => return Err(CodecError::UnsupportedDataType(other)),
    };

    Ok(value)
}

/// Read a count-prefixed wide-character string
///
/// A trailing NUL terminator, as devices send in datasets, is dropped.
pub fn read_string(reader: &mut &[u8]) -> Result<String> {
    ensure_available(reader, 1)?;
    let count = reader.read_u8().map_err(|_| truncated(1, 0))? as usize;
    ensure_available(reader, count * 2)?;

    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        units.push(read_fixed(reader, 2, |r| r.read_u16::<LittleEndian>())?);
    }
    while units.last() == Some(&0) {
        units.pop();
    }

    Ok(String::from_utf16_lossy(&units))
}

/// Encode the textual representation `text` as `data_type`
///
/// # Example
/// ```
/// use protocol::{DataType, encode_value};
///
/// assert_eq!(encode_value("-2", DataType::Int16).unwrap(), vec![0xFE, 0xFF]);
/// assert!(encode_value("70000", DataType::UInt16).is_err());
/// ```
pub fn encode_value(text: &str, data_type: DataType) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(data_type.scalar_width().unwrap_or(1 + text.len() * 2));

    match data_type {
        DataType::Int8 => buf.put_i8(parse(text, data_type)?),
        DataType::UInt8 => buf.put_u8(parse(text, data_type)?),
        DataType::Int16 => buf.put_i16_le(parse(text, data_type)?),
        DataType::UInt16 => buf.put_u16_le(parse(text, data_type)?),
        DataType::Int32 => buf.put_i32_le(parse(text, data_type)?),
        DataType::UInt32 => buf.put_u32_le(parse(text, data_type)?),
        DataType::Int64 => buf.put_i64_le(parse(text, data_type)?),
        DataType::UInt64 => buf.put_u64_le(parse(text, data_type)?),
        DataType::Str => {
            let units: Vec<u16> = text.encode_utf16().collect();
            let count = u8::try_from(units.len()).map_err(|_| CodecError::InvalidValue {
                value: text.to_string(),
                data_type,
            })?;
            buf.put_u8(count);
            for unit in units {
                buf.put_u16_le(unit);
            }
        }
        other => return Err(CodecError::UnsupportedDataType(other)),
    }

    Ok(buf)
}

fn is_decodable(data_type: DataType) -> bool {
    !matches!(data_type, DataType::Int128 | DataType::UInt128)
        && (!data_type.is_array() || matches!(data_type, DataType::AUInt16 | DataType::AUInt32))
}

fn parse<T: FromStr>(text: &str, data_type: DataType) -> Result<T> {
    text.parse().map_err(|_| CodecError::InvalidValue {
        value: text.to_string(),
        data_type,
    })
}

fn read_fixed<T>(
    reader: &mut &[u8],
    width: usize,
    read: impl FnOnce(&mut &[u8]) -> std::io::Result<T>,
) -> Result<T> {
    let available = reader.len();
    read(reader).map_err(|_| truncated(width, available))
}

fn read_array<T>(
    reader: &mut &[u8],
    width: usize,
    mut read: impl FnMut(&mut &[u8]) -> std::io::Result<T>,
) -> Result<Vec<T>> {
    ensure_available(reader, 4)?;
    let count = read_fixed(reader, 4, |r| r.read_u32::<LittleEndian>())? as usize;
    ensure_available(reader, count.saturating_mul(width))?;

    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_fixed(reader, width, &mut read)?);
    }
    Ok(items)
}

fn ensure_available(reader: &[u8], needed: usize) -> Result<()> {
    if reader.len() < needed {
        return Err(truncated(needed, reader.len()));
    }
    Ok(())
}

fn truncated(needed: usize, available: usize) -> CodecError {
    CodecError::Truncated { needed, available }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int8_round_trip(v in any::<i8>()) {
            let bytes = encode_value(&v.to_string(), DataType::Int8).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::Int8).unwrap(), Value::Int8(v));
        }

        #[test]
        fn prop_uint8_round_trip(v in any::<u8>()) {
            let bytes = encode_value(&v.to_string(), DataType::UInt8).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::UInt8).unwrap(), Value::UInt8(v));
        }

        #[test]
        fn prop_int16_round_trip(v in any::<i16>()) {
            let bytes = encode_value(&v.to_string(), DataType::Int16).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::Int16).unwrap(), Value::Int16(v));
        }

        #[test]
        fn prop_uint16_round_trip(v in any::<u16>()) {
            let bytes = encode_value(&v.to_string(), DataType::UInt16).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::UInt16).unwrap(), Value::UInt16(v));
        }

        #[test]
        fn prop_int32_round_trip(v in any::<i32>()) {
            let bytes = encode_value(&v.to_string(), DataType::Int32).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::Int32).unwrap(), Value::Int32(v));
        }

        #[test]
        fn prop_uint32_round_trip(v in any::<u32>()) {
            let bytes = encode_value(&v.to_string(), DataType::UInt32).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::UInt32).unwrap(), Value::UInt32(v));
        }

        #[test]
        fn prop_int64_round_trip(v in any::<i64>()) {
            let bytes = encode_value(&v.to_string(), DataType::Int64).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::Int64).unwrap(), Value::Int64(v));
        }

        #[test]
        fn prop_uint64_round_trip(v in any::<u64>()) {
            let bytes = encode_value(&v.to_string(), DataType::UInt64).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::UInt64).unwrap(), Value::UInt64(v));
        }

        #[test]
        fn prop_string_round_trip(s in "[a-zA-Z0-9_.-]{0,64}") {
            let bytes = encode_value(&s, DataType::Str).unwrap();
            prop_assert_eq!(decode_value(&bytes, DataType::Str).unwrap(), Value::Str(s));
        }
    }
}
