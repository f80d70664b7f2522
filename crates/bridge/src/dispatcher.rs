//! Command line parsing and dispatch
//!
//! One input line is one command. Parsing and arity checks happen before
//! any device interaction; every failure becomes the status-only result at
//! [`Bridge::dispatch`], which is the only place that conversion happens.

use crate::commands;
use crate::error::{BridgeError, Result};
use crate::registry::Registry;
use crate::result::{CommandResult, DeviceEvent};
use crate::session::SessionManager;
use crate::tracker::DeviceTracker;
use crate::transfer;
use protocol::{DeviceId, ObjectType, Transport};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DeviceList,
    DeviceInfo {
        device_id: DeviceId,
    },
    Desc {
        device_id: DeviceId,
        prop_name: String,
    },
    Get {
        device_id: DeviceId,
        prop_name: String,
    },
    Set {
        device_id: DeviceId,
        prop_name: String,
        value: String,
    },
    SendConfig {
        device_id: DeviceId,
        file_path: PathBuf,
    },
    GetConfig {
        device_id: DeviceId,
        file_path: PathBuf,
    },
    FirmwareUpdate {
        device_id: DeviceId,
        file_path: PathBuf,
    },
}

impl Command {
    /// Command names with their required argument counts
    pub const TABLE: [(&'static str, usize); 8] = [
        ("deviceList", 0),
        ("deviceInfo", 1),
        ("desc", 2),
        ("get", 2),
        ("set", 3),
        ("sendConfig", 2),
        ("getConfig", 2),
        ("firmwareUpdate", 2),
    ];

    /// Parse one line, splitting on whitespace
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = tokens.split_first().ok_or(BridgeError::NoCommand)?;

        let expected = Self::TABLE
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arity)| *arity)
            .ok_or(BridgeError::InvalidCommand)?;
        if args.len() != expected {
            return Err(BridgeError::InvalidArgumentCount {
                expected,
                actual: args.len(),
            });
        }

        let device = || DeviceId::from(args[0]);
        let command = match *name {
            "deviceList" => Command::DeviceList,
            "deviceInfo" => Command::DeviceInfo {
                device_id: device(),
            },
            "desc" => Command::Desc {
                device_id: device(),
                prop_name: args[1].to_string(),
            },
            "get" => Command::Get {
                device_id: device(),
                prop_name: args[1].to_string(),
            },
            "set" => Command::Set {
                device_id: device(),
                prop_name: args[1].to_string(),
                value: args[2].to_string(),
            },
            "sendConfig" => Command::SendConfig {
                device_id: device(),
                file_path: PathBuf::from(args[1]),
            },
            "getConfig" => Command::GetConfig {
                device_id: device(),
                file_path: PathBuf::from(args[1]),
            },
            "firmwareUpdate" => Command::FirmwareUpdate {
                device_id: device(),
                file_path: PathBuf::from(args[1]),
            },
            _ => return Err(BridgeError::InvalidCommand),
        };
        Ok(command)
    }
}

/// Bridge state: the active registry, the transport and the presence
/// baseline
pub struct Bridge<T: Transport> {
    registry: Arc<Registry>,
    sessions: SessionManager<T>,
    tracker: DeviceTracker,
}

impl<T: Transport> Bridge<T> {
    pub fn new(transport: T, registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: SessionManager::new(transport),
            tracker: DeviceTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Swap in a new registry snapshot
    pub fn set_registry(&mut self, registry: Registry) {
        self.registry = Arc::new(registry);
    }

    /// Run one command line to completion
    pub fn dispatch(&mut self, line: &str) -> CommandResult {
        match Command::parse(line).and_then(|command| self.execute(command)) {
            Ok(result) => result,
            Err(e) => {
                debug!("Command '{}' failed: {}", line.trim(), e);
                CommandResult::failure(&e)
            }
        }
    }

    /// Run an already parsed command
    pub fn execute(&mut self, command: Command) -> Result<CommandResult> {
        let registry = Arc::clone(&self.registry);
        let sessions = &mut self.sessions;

        match command {
            Command::DeviceList => self.tracker.list(sessions, &registry),
            Command::DeviceInfo { device_id } => {
                commands::device_info(sessions, &registry, &device_id)
            }
            Command::Desc {
                device_id,
                prop_name,
            } => commands::prop_desc(sessions, &registry, &device_id, &prop_name),
            Command::Get {
                device_id,
                prop_name,
            } => commands::get_prop(sessions, &registry, &device_id, &prop_name),
            Command::Set {
                device_id,
                prop_name,
                value,
            } => commands::set_prop(sessions, &registry, &device_id, &prop_name, &value),
            Command::SendConfig {
                device_id,
                file_path,
            } => transfer::send_config_object(
                sessions,
                &registry,
                &device_id,
                &file_path,
                ObjectType::Config,
            )
            .map(|()| CommandResult::ok()),
            Command::GetConfig {
                device_id,
                file_path,
            } => transfer::get_config_object(sessions, &registry, &device_id, &file_path)
                .map(|()| CommandResult::ok()),
            Command::FirmwareUpdate {
                device_id,
                file_path,
            } => transfer::send_config_object(
                sessions,
                &registry,
                &device_id,
                &file_path,
                ObjectType::Firmware,
            )
            .map(|()| CommandResult::ok()),
        }
    }

    /// Re-enumerate and return the hotplug events since the last refresh
    pub fn refresh_devices(&mut self) -> Vec<DeviceEvent> {
        let registry = Arc::clone(&self.registry);
        match self.tracker.refresh(&mut self.sessions, &registry) {
            Ok(delta) => delta.events(),
            Err(e) => {
                warn!("Device refresh failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Bridge behind the single device lock
///
/// Command dispatch and hotplug refreshes both take the lock for their
/// whole duration, so at most one of them touches the transport at a
/// time. The guard is scoped, so it is released on every exit path; a
/// poisoned lock is recovered.
pub struct SharedBridge<T: Transport> {
    inner: Arc<Mutex<Bridge<T>>>,
}

impl<T: Transport> Clone for SharedBridge<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SharedBridge<T> {
    pub fn new(bridge: Bridge<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bridge)),
        }
    }

    pub fn dispatch(&self, line: &str) -> CommandResult {
        self.lock().dispatch(line)
    }

    pub fn refresh_devices(&self) -> Vec<DeviceEvent> {
        self.lock().refresh_devices()
    }

    fn lock(&self) -> MutexGuard<'_, Bridge<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
