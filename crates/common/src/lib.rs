//! Common utilities for mtp-bridge
//!
//! This crate provides shared functionality between the bridge library and
//! its binary: error handling, logging setup, the hotplug event channel
//! that carries arrival/removal signals off the libusb event thread, and
//! transport test doubles.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{HotplugEvent, HotplugNotifier, HotplugReceiver, create_hotplug_channel};
pub use error::{Error, Result};
pub use logging::setup_logging;
