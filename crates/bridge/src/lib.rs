//! Line-oriented command bridge for still-image devices
//!
//! Reads one command per line, runs it against a device through a
//! [`protocol::Transport`], and answers with one JSON object per line.
//! Device arrival and removal are reported as events on a separate
//! channel.
//!
//! # Example
//!
//! ```
//! use bridge::{Bridge, Registry};
//! use common::test_utils::{ALLOWED_NAME, MockTransport};
//!
//! let transport = MockTransport::new().with_device("mock:001:004", ALLOWED_NAME);
//! let mut bridge = Bridge::new(transport, Registry::default());
//!
//! let result = bridge.dispatch("deviceList");
//! assert_eq!(result.to_json(), r#"{"status":"OK","devices":["001:004"]}"#);
//! ```

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod result;
pub mod service;
pub mod session;
pub mod tracker;
pub mod transfer;
pub mod usb;

pub use dispatcher::{Bridge, Command, SharedBridge};
pub use error::{BridgeError, Result};
pub use registry::{PropertyDescriptor, Registry};
pub use result::{CommandResult, DeviceEvent, DeviceEventKind};
pub use session::SessionManager;
pub use tracker::{DeviceDelta, DeviceTracker};
