//! Single-flight device sessions
//!
//! Owns the transport and runs one unit of work against one device:
//! confirm presence, open, run, always close. The transport supports a
//! single logical session, so callers serialize access through the bridge
//! guard.

use crate::error::{BridgeError, Result};
use crate::registry::Registry;
use protocol::{DeviceId, Request, Response, Transport, TransportSession};
use tracing::{debug, warn};

/// Session manager
pub struct SessionManager<T: Transport> {
    transport: T,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Currently present devices whose friendly name is allowed
    ///
    /// Returned ids are stripped of the transport's path prefix, in
    /// enumeration order.
    pub fn present_devices(&mut self, registry: &Registry) -> Result<Vec<DeviceId>> {
        let paths = self.transport.device_paths()?;
        let prefix = self.transport.path_prefix().to_string();

        let mut devices = Vec::new();
        for path in paths {
            match self.transport.friendly_name(&path) {
                Some(name) if registry.allows(&name) => {
                    devices.push(DeviceId::from_path(&path, &prefix));
                }
                Some(name) => debug!("Ignoring device {} ({})", path, name),
                None => debug!("Ignoring device {} (no friendly name)", path),
            }
        }
        Ok(devices)
    }

    /// Run `action` against an open session to `device_id`
    ///
    /// Fails with `DeviceNotFound` when the device is not currently
    /// enumerated, cannot be opened, or faults while `action` runs. The
    /// session is closed on every path; a close failure is logged and the
    /// session discarded, and never replaces the action's own outcome.
    pub fn with_device<R>(
        &mut self,
        registry: &Registry,
        device_id: &DeviceId,
        action: impl FnOnce(&mut DeviceSession<'_, T::Session>) -> Result<R>,
    ) -> Result<R> {
        let present = self.present_devices(registry).map_err(|e| {
            warn!("Enumeration failed: {}", e);
            BridgeError::DeviceNotFound
        })?;
        if !present.contains(device_id) {
            return Err(BridgeError::DeviceNotFound);
        }

        let path = device_id.to_path(self.transport.path_prefix());
        let mut session = self.transport.open(&path).map_err(|e| {
            warn!("Failed to open {}: {}", path, e);
            BridgeError::DeviceNotFound
        })?;
        debug!("Opened session to {}", path);

        let result = action(&mut DeviceSession {
            inner: &mut session,
        });

        if let Err(e) = session.close() {
            warn!("Failed to close session to {}, discarding it: {}", path, e);
        } else {
            debug!("Closed session to {}", path);
        }

        result.map_err(|e| match e {
            BridgeError::Transport(fault) => {
                warn!("Transport fault on {}: {}", path, fault);
                BridgeError::DeviceNotFound
            }
            other => other,
        })
    }
}

/// An open session as seen by command code
pub struct DeviceSession<'a, S: TransportSession> {
    inner: &'a mut S,
}

impl<S: TransportSession> DeviceSession<'_, S> {
    /// Execute an operation, returning the response whatever its code
    pub fn execute(&mut self, request: &Request) -> Result<Response> {
        Ok(self.inner.execute(request)?)
    }

    /// Execute an operation and fail on any non-OK response code
    pub fn execute_ok(&mut self, request: &Request) -> Result<Response> {
        let response = self.execute(request)?;
        if !response.is_ok() {
            return Err(BridgeError::Response(response.code));
        }
        Ok(response)
    }
}
