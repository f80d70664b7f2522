//! Hotplug event channel between the notification source and the bridge
//!
//! The notification source (the libusb event thread in production) only
//! knows two callbacks: a device arrived, a device left. It reports them
//! through a [`HotplugNotifier`]; the bridge consumes them from the
//! matching [`HotplugReceiver`] on its own execution context.

use async_channel::{Receiver, Sender, bounded};

/// Raw arrival/removal signal
///
/// The path is whatever the source knows about the device; the bridge
/// re-enumerates on every signal and does not rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A device was plugged in
    Arrived { path: String },
    /// A device was removed
    Left { path: String },
}

/// Sending half, held by the notification source
#[derive(Clone)]
pub struct HotplugNotifier {
    tx: Sender<HotplugEvent>,
}

impl HotplugNotifier {
    /// Device-arrived callback
    pub fn arrived(&self, path: impl Into<String>) -> crate::Result<()> {
        self.send(HotplugEvent::Arrived { path: path.into() })
    }

    /// Device-removed callback
    pub fn left(&self, path: impl Into<String>) -> crate::Result<()> {
        self.send(HotplugEvent::Left { path: path.into() })
    }

    fn send(&self, event: HotplugEvent) -> crate::Result<()> {
        self.tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Receiving half, held by the bridge
pub struct HotplugReceiver {
    rx: Receiver<HotplugEvent>,
}

impl HotplugReceiver {
    /// Wait for the next event; fails once every notifier is gone
    pub async fn recv(&self) -> crate::Result<HotplugEvent> {
        self.rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the hotplug channel
///
/// Returns (HotplugNotifier for the source, HotplugReceiver for the bridge)
pub fn create_hotplug_channel() -> (HotplugNotifier, HotplugReceiver) {
    let (tx, rx) = bounded(256);
    (HotplugNotifier { tx }, HotplugReceiver { rx })
}
