// ── Online state machine ──
//
// Online ──fail──▶ Degraded(1) ──fail──▶ Degraded(2) ──fail──▶ Offline
//   ▲                                                            │
//   └────────────────────────── success ─────────────────────────┘
//
// While degraded the device keeps whatever `online` value it had, so a
// single dropped packet never flips the UI.

use chrono::{DateTime, Utc};

use crate::model::Device;

/// Consecutive failures before a device is reported offline.
pub const OFFLINE_THRESHOLD: u32 = 3;

/// Link state derived from the failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Online,
    Degraded(u32),
    Offline,
}

/// Applies poll outcomes to a device's online bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct FailureTracker {
    threshold: u32,
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self {
            threshold: OFFLINE_THRESHOLD,
        }
    }
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record a successful poll at `now`.
    pub fn success(&self, device: &mut Device, now: DateTime<Utc>) -> LinkState {
        device.fail_count = 0;
        device.online = true;
        // last_seen never moves backwards
        if device.last_seen.is_none_or(|seen| seen < now) {
            device.last_seen = Some(now);
        }
        LinkState::Online
    }

    /// Record a failed poll.
    pub fn failure(&self, device: &mut Device) -> LinkState {
        device.fail_count = device.fail_count.saturating_add(1);
        if device.fail_count >= self.threshold {
            device.online = false;
        }
        self.state(device)
    }

    pub fn state(&self, device: &Device) -> LinkState {
        match device.fail_count {
            0 if device.online => LinkState::Online,
            0 => LinkState::Offline,
            n if n >= self.threshold => LinkState::Offline,
            n => LinkState::Degraded(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::DeviceKind;

    fn online_device() -> Device {
        let mut d = Device::http("n", DeviceKind::Sensor, "10.0.0.3");
        FailureTracker::default().success(&mut d, Utc::now());
        d
    }

    #[test]
    fn stays_online_below_threshold() {
        let tracker = FailureTracker::default();
        let mut d = online_device();

        assert_eq!(tracker.failure(&mut d), LinkState::Degraded(1));
        assert_eq!(tracker.failure(&mut d), LinkState::Degraded(2));
        assert!(d.online);

        assert_eq!(tracker.failure(&mut d), LinkState::Offline);
        assert!(!d.online);
    }

    #[test]
    fn success_resets_counter() {
        let tracker = FailureTracker::default();
        let mut d = online_device();

        tracker.failure(&mut d);
        tracker.failure(&mut d);
        tracker.success(&mut d, Utc::now());
        assert_eq!(d.fail_count(), 0);

        tracker.failure(&mut d);
        tracker.failure(&mut d);
        assert!(d.online);
    }

    #[test]
    fn never_polled_device_is_offline() {
        let tracker = FailureTracker::default();
        let mut d = Device::http("n", DeviceKind::Sensor, "10.0.0.3");
        assert_eq!(tracker.state(&d), LinkState::Offline);
        tracker.failure(&mut d);
        assert!(!d.online);
    }

    #[test]
    fn last_seen_is_monotonic() {
        let tracker = FailureTracker::default();
        let mut d = online_device();
        let seen = d.last_seen;
        tracker.success(&mut d, Utc::now() - Duration::hours(1));
        assert_eq!(d.last_seen, seen);
    }

    #[test]
    fn recovers_only_on_success() {
        let tracker = FailureTracker::default();
        let mut d = online_device();
        for _ in 0..5 {
            tracker.failure(&mut d);
        }
        assert_eq!(tracker.state(&d), LinkState::Offline);
        tracker.success(&mut d, Utc::now());
        assert_eq!(tracker.state(&d), LinkState::Online);
    }
}
