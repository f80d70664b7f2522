//! Device information and property commands
//!
//! Each command resolves its property through the registry before any
//! device interaction, runs one operation inside a device session and
//! shapes the reply.

use crate::error::Result;
use crate::registry::Registry;
use crate::result::{CommandResult, DeviceInfoFields, PropDescFields};
use crate::session::SessionManager;
use protocol::codes::operation;
use protocol::{
    DeviceId, DeviceInfo, DevicePropDesc, Request, Transport, decode_value, encode_value,
};
use tracing::debug;

/// `deviceInfo`
pub fn device_info<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
) -> Result<CommandResult> {
    let info = sessions.with_device(registry, device_id, |session| {
        let response = session.execute_ok(&Request::read(operation::GET_DEVICE_INFO, vec![]))?;
        Ok(DeviceInfo::parse(&response.data)?)
    })?;

    debug!("{} is {} {}", device_id, info.manufacturer, info.model);
    Ok(CommandResult::DeviceInfo(DeviceInfoFields::from(info)))
}

/// `desc`
pub fn prop_desc<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
    prop_name: &str,
) -> Result<CommandResult> {
    let property = registry.lookup(prop_name)?;
    let desc = sessions.with_device(registry, device_id, |session| {
        let response = session.execute_ok(&Request::read(
            operation::GET_DEVICE_PROP_DESC,
            vec![u32::from(property.code)],
        ))?;
        Ok(DevicePropDesc::parse(&response.data)?)
    })?;

    Ok(CommandResult::PropDesc(PropDescFields::from(desc)))
}

/// `get`
///
/// The value is decoded with the registry's type for the property.
pub fn get_prop<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
    prop_name: &str,
) -> Result<CommandResult> {
    let property = registry.lookup(prop_name)?;
    let value = sessions.with_device(registry, device_id, |session| {
        let response = session.execute_ok(&Request::read(
            operation::GET_DEVICE_PROP_VALUE,
            vec![u32::from(property.code)],
        ))?;
        Ok(decode_value(&response.data, property.data_type)?)
    })?;

    Ok(CommandResult::prop_value(value))
}

/// `set`
///
/// The value is encoded before a session is opened, so unparseable input
/// never reaches the device.
pub fn set_prop<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
    prop_name: &str,
    value: &str,
) -> Result<CommandResult> {
    let property = registry.lookup(prop_name)?;
    let payload = encode_value(value, property.data_type)?;

    sessions.with_device(registry, device_id, |session| {
        session.execute_ok(&Request::write(
            operation::SET_DEVICE_PROP_VALUE,
            vec![u32::from(property.code)],
            payload,
        ))
    })?;

    debug!("Set {} = {} on {}", prop_name, value, device_id);
    Ok(CommandResult::ok())
}
