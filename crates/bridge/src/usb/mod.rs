//! USB subsystem
//!
//! The libusb-backed transport and hotplug source. Both share one libusb
//! context; the transport is driven from the bridge lock, the hotplug
//! source runs its own event thread.

pub mod hotplug;
pub mod transport;

pub use hotplug::HotplugWatcher;
pub use transport::{PATH_PREFIX, UsbSession, UsbTransport};

use protocol::TransportError;

/// Map a libusb error into the transport error space
pub(crate) fn usb_error(e: rusb::Error) -> TransportError {
    match e {
        rusb::Error::NoDevice | rusb::Error::NotFound => TransportError::NotFound,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::InvalidParam => TransportError::InvalidArgument(e.to_string()),
        other => TransportError::Communication(other.to_string()),
    }
}
