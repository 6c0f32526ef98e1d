// ── Power-state change detection ──
//
// Per device we remember the last observed on/off state. The first
// observation only seeds that baseline. A device that has not reported
// its power state yet is neither seeded nor compared. A later observation that
// differs is a transition: it is logged (when logging is on) and pushed
// only if the device's rule opts into that direction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::changelog::ChangeLogSink;
use crate::model::{ChangeLogEntry, Device, DeviceId, NotificationRules, PowerAction};
use crate::notify::NotificationSink;

/// Outcome of observing one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No power data yet; baseline untouched.
    Unknown,
    /// First sighting; baseline recorded.
    Baseline,
    Unchanged,
    Transition(PowerAction),
}

/// A detected transition and what was done about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub device_id: DeviceId,
    pub device_name: String,
    pub action: PowerAction,
    pub logged: bool,
    pub notified: bool,
}

/// Debounces power-state changes into log entries and notifications.
pub struct ChangeDetector {
    last_known: DashMap<DeviceId, bool>,
    rules: ArcSwap<NotificationRules>,
    logging: AtomicBool,
}

impl ChangeDetector {
    pub fn new(rules: NotificationRules, logging: bool) -> Self {
        Self {
            last_known: DashMap::new(),
            rules: ArcSwap::from_pointee(rules),
            logging: AtomicBool::new(logging),
        }
    }

    /// Replace the whole rule map.
    pub fn set_rules(&self, rules: NotificationRules) {
        self.rules.store(Arc::new(rules));
    }

    pub fn rules(&self) -> Arc<NotificationRules> {
        self.rules.load_full()
    }

    pub fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Relaxed);
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Last recorded state, if the device has been observed.
    pub fn last_known(&self, id: &DeviceId) -> Option<bool> {
        self.last_known.get(id).map(|r| *r.value())
    }

    /// Drop the baseline of a removed device.
    pub fn forget(&self, id: &DeviceId) {
        self.last_known.remove(id);
    }

    /// Compare the device's current power state against its baseline.
    pub fn observe(&self, device: &Device) -> Observation {
        let Some(current) = device.power_state() else {
            return Observation::Unknown;
        };
        match self.last_known.entry(device.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(current);
                Observation::Baseline
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() == current {
                    Observation::Unchanged
                } else {
                    slot.insert(current);
                    Observation::Transition(PowerAction::from(current))
                }
            }
        }
    }

    /// Observe every visible device and act on the transitions found.
    pub fn process<'a>(
        &self,
        devices: impl IntoIterator<Item = &'a Device>,
        log: &dyn ChangeLogSink,
        notifier: &dyn NotificationSink,
    ) -> Vec<Transition> {
        let rules = self.rules.load();
        let logging = self.logging_enabled();
        let mut transitions = Vec::new();

        for device in devices.into_iter().filter(|d| d.visible) {
            let Observation::Transition(action) = self.observe(device) else {
                continue;
            };
            info!(device_id = %device.id, name = %device.name, %action, "power state changed");

            if logging {
                log.append(ChangeLogEntry::new(device.id.clone(), &device.name, action));
            }

            let wanted = rules.get(&device.id).is_some_and(|rule| rule.allows(action));
            let notified = wanted && notifier.send(&notification_title(&device.name, action), "");
            if wanted && !notified {
                debug!(device_id = %device.id, "notification not dispatched");
            }

            transitions.push(Transition {
                device_id: device.id.clone(),
                device_name: device.name.clone(),
                action,
                logged: logging,
                notified,
            });
        }
        transitions
    }
}

/// Title of the push sent for a transition.
pub fn notification_title(device_name: &str, action: PowerAction) -> String {
    format!("Heads up: {device_name} turned {action}")
}
