//! Command results and event lines
//!
//! Every result serializes to one JSON object that always carries a
//! `status` field. Success shapes add command-specific fields; the failure
//! shape is `status` alone.

use crate::error::BridgeError;
use protocol::{DeviceId, DeviceInfo, DevicePropDesc, PropForm, Value};
use serde::Serialize;

pub const STATUS_OK: &str = "OK";
pub const STATUS_NO_DEVICES: &str = "No Devices";

/// Result of one dispatched command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    DeviceList {
        status: String,
        devices: Vec<DeviceId>,
    },
    DeviceInfo(DeviceInfoFields),
    PropDesc(PropDescFields),
    PropValue {
        status: String,
        current: Value,
    },
    /// Status-only result, used for plain success and for every failure
    Status {
        status: String,
    },
}

/// Fields reported by `deviceInfo`
///
/// Key spellings are kept as existing callers parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfoFields {
    pub status: String,
    #[serde(rename = "StandardVersion")]
    pub standard_version: u16,
    #[serde(rename = "VenderExtensionId")]
    pub vendor_extension_id: u32,
    #[serde(rename = "VenderExtensionVersion")]
    pub vendor_extension_version: u16,
    #[serde(rename = "FunctionalMode")]
    pub functional_mode: u16,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "DeviceVersion")]
    pub device_version: String,
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
}

impl From<DeviceInfo> for DeviceInfoFields {
    fn from(info: DeviceInfo) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            standard_version: info.standard_version,
            vendor_extension_id: info.vendor_extension_id,
            vendor_extension_version: info.vendor_extension_version,
            functional_mode: info.functional_mode,
            manufacturer: info.manufacturer,
            model: info.model,
            device_version: info.device_version,
            serial_number: info.serial_number,
        }
    }
}

/// Fields reported by `desc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropDescFields {
    pub status: String,
    pub current: Value,
    pub factory_default_value: Value,
    pub get_set: u8,
    #[serde(flatten)]
    pub form: FormFields,
}

/// Range or enumeration part of `desc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormFields {
    Range { min: Value, max: Value, step: Value },
    /// `values: null` when the property has no form
    Values { values: Option<Vec<Value>> },
}

impl From<DevicePropDesc> for PropDescFields {
    fn from(desc: DevicePropDesc) -> Self {
        let form = match desc.form {
            PropForm::Range { min, max, step } => FormFields::Range { min, max, step },
            PropForm::Enumeration(values) => FormFields::Values {
                values: Some(values),
            },
            PropForm::None => FormFields::Values { values: None },
        };

        Self {
            status: STATUS_OK.to_string(),
            current: desc.current,
            factory_default_value: desc.factory_default,
            get_set: desc.get_set,
            form,
        }
    }
}

impl CommandResult {
    /// Status-only success
    pub fn ok() -> Self {
        CommandResult::Status {
            status: STATUS_OK.to_string(),
        }
    }

    /// The uniform failure shape
    pub fn failure(error: &BridgeError) -> Self {
        CommandResult::Status {
            status: error.to_string(),
        }
    }

    /// Device listing; status reflects whether anything was found
    pub fn device_list(devices: Vec<DeviceId>) -> Self {
        let status = if devices.is_empty() {
            STATUS_NO_DEVICES
        } else {
            STATUS_OK
        };
        CommandResult::DeviceList {
            status: status.to_string(),
            devices,
        }
    }

    pub fn prop_value(current: Value) -> Self {
        CommandResult::PropValue {
            status: STATUS_OK.to_string(),
            current,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            CommandResult::DeviceList { status, .. }
            | CommandResult::PropValue { status, .. }
            | CommandResult::Status { status } => status,
            CommandResult::DeviceInfo(fields) => &fields.status,
            CommandResult::PropDesc(fields) => &fields.status,
        }
    }

    /// Single-line JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "status": format!("Serialization error: {}", e) }).to_string()
        })
    }
}

/// Hotplug notification emitted on the event side channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub event: DeviceEventKind,
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceEventKind {
    DeviceAdded,
    DeviceRemoved,
}

impl DeviceEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_shapes() {
        assert_eq!(CommandResult::ok().to_json(), r#"{"status":"OK"}"#);
        assert_eq!(
            CommandResult::failure(&BridgeError::InvalidCommand).to_json(),
            r#"{"status":"Invalid command"}"#
        );
    }

    #[test]
    fn test_device_list_shape() {
        assert_eq!(
            CommandResult::device_list(vec![]).to_json(),
            r#"{"status":"No Devices","devices":[]}"#
        );
        assert_eq!(
            CommandResult::device_list(vec![DeviceId::from("001:004")]).to_json(),
            r#"{"status":"OK","devices":["001:004"]}"#
        );
    }

    #[test]
    fn test_prop_value_shape() {
        assert_eq!(
            CommandResult::prop_value(Value::Int16(-3)).to_json(),
            r#"{"status":"OK","current":-3}"#
        );
    }

    #[test]
    fn test_desc_range_shape() {
        let fields = PropDescFields {
            status: STATUS_OK.to_string(),
            current: Value::Int16(0),
            factory_default_value: Value::Int16(0),
            get_set: 1,
            form: FormFields::Range {
                min: Value::Int16(-3),
                max: Value::Int16(3),
                step: Value::Int16(1),
            },
        };
        assert_eq!(
            CommandResult::PropDesc(fields).to_json(),
            r#"{"status":"OK","current":0,"factory_default_value":0,"get_set":1,"min":-3,"max":3,"step":1}"#
        );
    }

    #[test]
    fn test_desc_without_form_has_null_values() {
        let fields = PropDescFields {
            status: STATUS_OK.to_string(),
            current: Value::Str("x".into()),
            factory_default_value: Value::Str(String::new()),
            get_set: 0,
            form: FormFields::Values { values: None },
        };
        let json: serde_json::Value =
            serde_json::from_str(&CommandResult::PropDesc(fields).to_json()).unwrap();
        assert!(json["values"].is_null());
        assert_eq!(json["current"], "x");
    }

    #[test]
    fn test_event_shape() {
        let event = DeviceEvent {
            event: DeviceEventKind::DeviceRemoved,
            device_id: DeviceId::from("001:004"),
        };
        assert_eq!(
            event.to_json(),
            r#"{"event":"DeviceRemoved","deviceId":"001:004"}"#
        );
    }
}
