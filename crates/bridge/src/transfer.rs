//! Config and firmware object transfer
//!
//! Objects move through two vendor operations: one pushes a blob to the
//! device with a write data phase, the other pulls the config blob back
//! with a read data phase.

use crate::error::{BridgeError, Result};
use crate::registry::Registry;
use crate::session::SessionManager;
use protocol::codes::operation;
use protocol::{ConfigObjectHeader, DeviceId, ObjectType, Request, Transport};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static FIRMWARE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\A..\d_v(\d{3})\.frm\z").ok());

/// Firmware version carried by a firmware file name
///
/// Only the base name is checked: two arbitrary characters, a digit, `_v`,
/// three version digits and a `.frm` extension, ignoring case.
pub fn firmware_version(file_path: &Path) -> Option<u32> {
    let name = file_path.file_name()?.to_str()?;
    let caps = FIRMWARE_NAME.as_ref()?.captures(name)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Push a config or firmware object to a device
///
/// The file name (for firmware) and content are validated before any
/// device interaction.
pub fn send_config_object<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
    file_path: &Path,
    object_type: ObjectType,
) -> Result<()> {
    let version = match object_type {
        ObjectType::Firmware => firmware_version(file_path).ok_or(BridgeError::InvalidFileName)?,
        ObjectType::Config => 0,
    };

    let payload = fs::read(file_path)?;
    if payload.is_empty() {
        return Err(BridgeError::InvalidFileContent);
    }
    let length = u32::try_from(payload.len()).map_err(|_| BridgeError::InvalidFileContent)?;

    let header = ConfigObjectHeader {
        object_type,
        length,
        version,
    };
    debug!(
        "Sending {:?} object ({} bytes, version {}) to {}",
        object_type, length, version, device_id
    );

    sessions.with_device(registry, device_id, |session| {
        session.execute_ok(&Request::write(
            operation::SEND_CONFIG_OBJECT,
            header.params(),
            payload,
        ))
    })?;

    info!("Sent {:?} object to {}", object_type, device_id);
    Ok(())
}

/// Pull the config object from a device into `file_path`
///
/// An existing file is overwritten; nothing is written unless the device
/// answered OK.
pub fn get_config_object<T: Transport>(
    sessions: &mut SessionManager<T>,
    registry: &Registry,
    device_id: &DeviceId,
    file_path: &Path,
) -> Result<()> {
    let response = sessions.with_device(registry, device_id, |session| {
        session.execute_ok(&Request::read(
            operation::GET_CONFIG_OBJECT,
            vec![ObjectType::Config as u32],
        ))
    })?;

    fs::write(file_path, &response.data)?;
    debug!(
        "Wrote {} byte config object from {} to {}",
        response.data.len(),
        device_id,
        file_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{ALLOWED_NAME, MockTransport};
    use protocol::DataPhase;
    use protocol::codes::response;
    use protocol::Response;

    #[test]
    fn test_firmware_version_from_name() {
        assert_eq!(firmware_version(Path::new("A1_v002.frm")), Some(2));
        assert_eq!(firmware_version(Path::new("/tmp/fw/xY9_V123.FRM")), Some(123));
        assert_eq!(firmware_version(Path::new("A1_v02.frm")), None);
        assert_eq!(firmware_version(Path::new("A1_v0021.frm")), None);
        assert_eq!(firmware_version(Path::new("A1.frm")), None);
        assert_eq!(firmware_version(Path::new("AB_v002.frm")), None);
        assert_eq!(firmware_version(Path::new("A1_v002.frm.bak")), None);
    }

    #[test]
    fn test_firmware_pattern_compiled_once() {
        assert!(FIRMWARE_NAME.is_some());
        for _ in 0..3 {
            assert_eq!(firmware_version(Path::new("B7_v310.frm")), Some(310));
        }
    }

    #[test]
    fn test_config_push_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.bin");
        fs::write(&path, [1, 2, 3, 4, 5]).unwrap();

        let mock = MockTransport::new()
            .with_device("mock:a", ALLOWED_NAME)
            .with_ok(operation::SEND_CONFIG_OBJECT, vec![]);
        let mut sessions = SessionManager::new(mock.clone());

        send_config_object(
            &mut sessions,
            &Registry::default(),
            &DeviceId::from("a"),
            &path,
            ObjectType::Config,
        )
        .unwrap();

        let executed = mock.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].params, vec![1, 5, 0]);
        assert_eq!(executed[0].data, DataPhase::Write(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_get_config_failure_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"old").unwrap();

        let mock = MockTransport::new().with_device("mock:a", ALLOWED_NAME).with_response(
            operation::GET_CONFIG_OBJECT,
            Response {
                code: response::GENERAL_ERROR,
                ..Default::default()
            },
        );
        let mut sessions = SessionManager::new(mock);

        let err = get_config_object(&mut sessions, &Registry::default(), &DeviceId::from("a"), &path)
            .unwrap_err();
        assert_eq!(err.to_string(), "FAILED(2002)");
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }
}
