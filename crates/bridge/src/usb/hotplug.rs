//! libusb hotplug source
//!
//! Registers arrival/removal callbacks with libusb and forwards them as
//! [`HotplugEvent`](common::HotplugEvent)s. libusb only delivers callbacks
//! while events are being handled, so the watcher owns a thread that pumps
//! the context until stopped.

use super::transport::PATH_PREFIX;
use common::HotplugNotifier;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the event thread checks its stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Forwards libusb callbacks to the hotplug channel
struct HotplugForwarder {
    notifier: HotplugNotifier,
}

impl<T: UsbContext> Hotplug<T> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<T>) {
        let path = device_path(&device);
        debug!("Hot-plug callback: device arrived ({})", path);
        if let Err(e) = self.notifier.arrived(path) {
            warn!("Dropped arrival notification: {}", e);
        }
    }

    fn device_left(&mut self, device: Device<T>) {
        let path = device_path(&device);
        debug!("Hot-plug callback: device left ({})", path);
        if let Err(e) = self.notifier.left(path) {
            warn!("Dropped removal notification: {}", e);
        }
    }
}

fn device_path<T: UsbContext>(device: &Device<T>) -> String {
    format!(
        "{}{:03}:{:03}",
        PATH_PREFIX,
        device.bus_number(),
        device.address()
    )
}

/// Running hotplug registration plus its event thread
pub struct HotplugWatcher {
    registration: Option<Registration<Context>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HotplugWatcher {
    /// Register callbacks and start the event thread
    ///
    /// Returns `Ok(None)` when libusb has no hotplug support on this
    /// platform; the bridge then runs without device events.
    pub fn start(context: &Context, notifier: HotplugNotifier) -> anyhow::Result<Option<Self>> {
        if !rusb::has_hotplug() {
            warn!("libusb hotplug not supported, device events disabled");
            return Ok(None);
        }

        let callback: Box<dyn Hotplug<Context>> = Box::new(HotplugForwarder { notifier });
        let registration = HotplugBuilder::new()
            .enumerate(false)
            .register(context.clone(), callback)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            let context = context.clone();
            std::thread::Builder::new()
                .name("usb-hotplug".to_string())
                .spawn(move || pump_events(&context, &stop))?
        };

        info!("Hot-plug callbacks registered");
        Ok(Some(Self {
            registration: Some(registration),
            stop,
            thread: Some(thread),
        }))
    }

    /// Deregister callbacks and join the event thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // dropping the registration deregisters the callbacks
        self.registration.take();
        self.stop.store(true, Ordering::SeqCst);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Hot-plug event thread panicked");
            }
            debug!("Hot-plug event thread stopped");
        }
    }
}

impl Drop for HotplugWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn pump_events(context: &Context, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        match context.handle_events(Some(POLL_INTERVAL)) {
            Ok(()) => {}
            Err(rusb::Error::Interrupted) => debug!("USB event handling interrupted"),
            Err(e) => {
                warn!("Error handling USB events: {}", e);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}
