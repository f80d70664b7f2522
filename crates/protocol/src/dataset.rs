//! DeviceInfo and DevicePropDesc dataset parsing
//!
//! Datasets are the payloads of GetDeviceInfo and GetDevicePropDesc. Both
//! are sequences of codec-encoded fields, so parsing reuses the value codec
//! and inherits its data type limits.

use crate::codec::{read_string, read_value};
use crate::codes::form;
use crate::error::{CodecError, Result};
use crate::types::{DataType, Value};
use byteorder::{LittleEndian, ReadBytesExt};

/// Parsed DeviceInfo dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub standard_version: u16,
    pub vendor_extension_id: u32,
    pub vendor_extension_version: u16,
    pub vendor_extension_desc: String,
    pub functional_mode: u16,
    pub operations_supported: Vec<u16>,
    pub events_supported: Vec<u16>,
    pub device_properties_supported: Vec<u16>,
    pub capture_formats: Vec<u16>,
    pub image_formats: Vec<u16>,
    pub manufacturer: String,
    pub model: String,
    pub device_version: String,
    pub serial_number: String,
}

impl DeviceInfo {
    /// Parse a DeviceInfo dataset
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = bytes;

        Ok(Self {
            standard_version: read_u16(&mut r)?,
            vendor_extension_id: read_u32(&mut r)?,
            vendor_extension_version: read_u16(&mut r)?,
            vendor_extension_desc: read_string(&mut r)?,
            functional_mode: read_u16(&mut r)?,
            operations_supported: read_u16_array(&mut r)?,
            events_supported: read_u16_array(&mut r)?,
            device_properties_supported: read_u16_array(&mut r)?,
            capture_formats: read_u16_array(&mut r)?,
            image_formats: read_u16_array(&mut r)?,
            manufacturer: read_string(&mut r)?,
            model: read_string(&mut r)?,
            device_version: read_string(&mut r)?,
            serial_number: read_string(&mut r)?,
        })
    }
}

/// Allowed-value form of a device property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropForm {
    None,
    Range { min: Value, max: Value, step: Value },
    Enumeration(Vec<Value>),
}

/// Parsed DevicePropDesc dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePropDesc {
    pub property_code: u16,
    pub data_type: DataType,
    /// 0 = read-only, 1 = read-write
    pub get_set: u8,
    pub factory_default: Value,
    pub current: Value,
    pub form: PropForm,
}

impl DevicePropDesc {
    /// Parse a DevicePropDesc dataset
    ///
    /// Values are decoded with the data type the dataset declares.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = bytes;

        let property_code = read_u16(&mut r)?;
        let data_type = DataType::from_code(read_u16(&mut r)?)?;
        let get_set = read_u8(&mut r)?;
        let factory_default = read_value(&mut r, data_type)?;
        let current = read_value(&mut r, data_type)?;

        // Some devices omit the form flag entirely when there is no form
        let form_flag = if r.is_empty() { form::NONE } else { read_u8(&mut r)? };
        let form = match form_flag {
            form::RANGE => PropForm::Range {
                min: read_value(&mut r, data_type)?,
                max: read_value(&mut r, data_type)?,
                step: read_value(&mut r, data_type)?,
            },
            form::ENUMERATION => {
                let count = read_u16(&mut r)?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(read_value(&mut r, data_type)?);
                }
                PropForm::Enumeration(values)
            }
            _ => PropForm::None,
        };

        Ok(Self {
            property_code,
            data_type,
            get_set,
            factory_default,
            current,
            form,
        })
    }
}

fn read_u8(r: &mut &[u8]) -> Result<u8> {
    let available = r.len();
    r.read_u8().map_err(|_| CodecError::Truncated {
        needed: 1,
        available,
    })
}

fn read_u16(r: &mut &[u8]) -> Result<u16> {
    let available = r.len();
    r.read_u16::<LittleEndian>().map_err(|_| CodecError::Truncated {
        needed: 2,
        available,
    })
}

fn read_u32(r: &mut &[u8]) -> Result<u32> {
    let available = r.len();
    r.read_u32::<LittleEndian>().map_err(|_| CodecError::Truncated {
        needed: 4,
        available,
    })
}

fn read_u16_array(r: &mut &[u8]) -> Result<Vec<u16>> {
    match read_value(r, DataType::AUInt16)? {
        Value::UInt16Array(items) => Ok(items),
        _ => unreachable!("AUINT16 always decodes to a u16 array"),
    }
}
