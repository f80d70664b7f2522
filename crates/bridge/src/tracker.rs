//! Device presence tracking
//!
//! Keeps the last enumerated set of supported devices and reports what
//! changed since the previous refresh.

use crate::error::Result;
use crate::registry::Registry;
use crate::result::{CommandResult, DeviceEvent, DeviceEventKind};
use crate::session::SessionManager;
use protocol::{DeviceId, Transport};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Devices that appeared and disappeared between two refreshes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDelta {
    pub added: BTreeSet<DeviceId>,
    pub removed: BTreeSet<DeviceId>,
}

impl DeviceDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Event lines for this delta, arrivals first
    pub fn events(&self) -> Vec<DeviceEvent> {
        let removed = self.removed.iter().map(|id| DeviceEvent {
            event: DeviceEventKind::DeviceRemoved,
            device_id: id.clone(),
        });
        let added = self.added.iter().map(|id| DeviceEvent {
            event: DeviceEventKind::DeviceAdded,
            device_id: id.clone(),
        });
        added.chain(removed).collect()
    }
}

#[derive(Debug, Default)]
pub struct DeviceTracker {
    snapshot: BTreeSet<DeviceId>,
}

impl DeviceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-enumerate and diff against the previous snapshot
    ///
    /// The new enumeration becomes the baseline for the next call.
    pub fn refresh<T: Transport>(
        &mut self,
        sessions: &mut SessionManager<T>,
        registry: &Registry,
    ) -> Result<DeviceDelta> {
        let current: BTreeSet<DeviceId> = sessions.present_devices(registry)?.into_iter().collect();

        let delta = DeviceDelta {
            added: current.difference(&self.snapshot).cloned().collect(),
            removed: self.snapshot.difference(&current).cloned().collect(),
        };
        self.snapshot = current;

        if delta.is_empty() {
            debug!("Device refresh: no change ({} present)", self.snapshot.len());
        } else {
            info!(
                "Device refresh: {} added, {} removed",
                delta.added.len(),
                delta.removed.len()
            );
        }
        Ok(delta)
    }

    /// Current device listing
    ///
    /// Enumerates afresh; the baseline used by [`refresh`](Self::refresh)
    /// is left alone so hotplug deltas are never swallowed by a listing.
    pub fn list<T: Transport>(
        &self,
        sessions: &mut SessionManager<T>,
        registry: &Registry,
    ) -> Result<CommandResult> {
        Ok(CommandResult::device_list(sessions.present_devices(registry)?))
    }

    /// Devices seen by the last refresh
    pub fn snapshot(&self) -> &BTreeSet<DeviceId> {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{ALLOWED_NAME, MockTransport};

    fn ids(list: &[&str]) -> BTreeSet<DeviceId> {
        list.iter().map(|s| DeviceId::from(*s)).collect()
    }

    #[test]
    fn test_refresh_reports_set_difference() {
        let mock = MockTransport::new()
            .with_device("mock:A", ALLOWED_NAME)
            .with_device("mock:B", ALLOWED_NAME);
        let mut sessions = SessionManager::new(mock.clone());
        let registry = Registry::default();
        let mut tracker = DeviceTracker::new();

        let first = tracker.refresh(&mut sessions, &registry).unwrap();
        assert_eq!(first.added, ids(&["A", "B"]));

        mock.set_devices(&[("mock:C", ALLOWED_NAME), ("mock:B", ALLOWED_NAME)]);
        let delta = tracker.refresh(&mut sessions, &registry).unwrap();
        assert_eq!(delta.added, ids(&["C"]));
        assert_eq!(delta.removed, ids(&["A"]));

        let again = tracker.refresh(&mut sessions, &registry).unwrap();
        assert!(again.is_empty());
        assert_eq!(tracker.snapshot(), &ids(&["B", "C"]));
    }

    #[test]
    fn test_unsupported_devices_never_tracked() {
        let mock = MockTransport::new()
            .with_device("mock:A", "Webcam")
            .with_device("mock:B", ALLOWED_NAME);
        let mut sessions = SessionManager::new(mock);
        let delta = DeviceTracker::new()
            .refresh(&mut sessions, &Registry::default())
            .unwrap();
        assert_eq!(delta.added, ids(&["B"]));
    }

    #[test]
    fn test_list_does_not_move_baseline() {
        let mock = MockTransport::new().with_device("mock:A", ALLOWED_NAME);
        let mut sessions = SessionManager::new(mock);
        let registry = Registry::default();
        let mut tracker = DeviceTracker::new();

        let listing = tracker.list(&mut sessions, &registry).unwrap();
        assert_eq!(listing.status(), "OK");

        let delta = tracker.refresh(&mut sessions, &registry).unwrap();
        assert_eq!(delta.added, ids(&["A"]));
    }

    #[test]
    fn test_events_order() {
        let delta = DeviceDelta {
            added: ids(&["C"]),
            removed: ids(&["A"]),
        };
        let events = delta.events();
        assert_eq!(events[0].event, DeviceEventKind::DeviceAdded);
        assert_eq!(events[0].device_id, DeviceId::from("C"));
        assert_eq!(events[1].event, DeviceEventKind::DeviceRemoved);
    }
}
