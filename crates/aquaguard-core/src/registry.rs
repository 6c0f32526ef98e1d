// ── Device registry ──
//
// Concurrent device table with per-key atomic updates. Readers get
// `Arc<Device>` snapshots that are never half-written: every mutation
// builds a new value and swaps it in under the shard lock for that id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Device, DeviceId};

/// Thread-safe table of every known device.
pub struct DeviceRegistry {
    devices: DashMap<DeviceId, Arc<Device>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            devices: DashMap::new(),
            version,
        }
    }

    /// Seed a registry from a device list.
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let registry = Self::new();
        for device in devices {
            registry.upsert(device);
        }
        registry
    }

    pub fn get(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.devices.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Every device, ordered by name then id.
    pub fn list(&self) -> Vec<Arc<Device>> {
        let mut all: Vec<Arc<Device>> = self.devices.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Insert or replace a device. Returns `true` if the id was new.
    pub fn upsert(&self, device: Device) -> bool {
        let is_new = self
            .devices
            .insert(device.id.clone(), Arc::new(device))
            .is_none();
        self.bump_version();
        is_new
    }

    /// Remove a device. Returns the removed record if it existed.
    pub fn remove(&self, id: &DeviceId) -> Option<Arc<Device>> {
        let removed = self.devices.remove(id).map(|(_, d)| d);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Apply `f` to one device as a single atomic unit.
    ///
    /// Concurrent updates to the same id are serialized by the map's
    /// shard lock; `f` must not block or touch the registry. Returns the
    /// updated snapshot, or `None` if the id is unknown.
    pub fn update<F>(&self, id: &DeviceId, f: F) -> Option<Arc<Device>>
    where
        F: FnOnce(&mut Device),
    {
        let updated = {
            let mut entry = self.devices.get_mut(id)?;
            let device = Arc::make_mut(entry.value_mut());
            f(device);
            Arc::clone(entry.value())
        };
        self.bump_version();
        Some(updated)
    }

    /// Find a device by its cloud identifier.
    pub fn find_by_external_id(&self, external_id: &str) -> Option<Arc<Device>> {
        self.devices
            .iter()
            .find(|r| r.value().external_id.as_deref() == Some(external_id))
            .map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceKind;

    fn light(name: &str) -> Device {
        Device::http(name, DeviceKind::Light, "10.0.0.9")
    }

    #[test]
    fn upsert_reports_new_ids() {
        let reg = DeviceRegistry::new();
        let d = light("a");
        assert!(reg.upsert(d.clone()));
        assert!(!reg.upsert(d));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_returns_record() {
        let reg = DeviceRegistry::new();
        let d = light("a");
        let id = d.id.clone();
        reg.upsert(d);
        assert_eq!(reg.remove(&id).unwrap().name, "a");
        assert!(reg.remove(&id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn update_does_not_mutate_prior_snapshot() {
        let reg = DeviceRegistry::new();
        let d = light("before");
        let id = d.id.clone();
        reg.upsert(d);

        let snapshot = reg.get(&id).unwrap();
        let after = reg.update(&id, |d| d.name = "after".into()).unwrap();

        assert_eq!(snapshot.name, "before");
        assert_eq!(after.name, "after");
        assert_eq!(reg.get(&id).unwrap().name, "after");
    }

    #[test]
    fn update_unknown_id_is_none() {
        let reg = DeviceRegistry::new();
        assert!(reg.update(&DeviceId::from("missing"), |_| {}).is_none());
    }

    #[test]
    fn list_is_sorted_by_name() {
        let reg = DeviceRegistry::from_devices([light("b"), light("a"), light("c")]);
        let names: Vec<_> = reg.list().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn subscribers_see_mutations() {
        let reg = DeviceRegistry::new();
        let rx = reg.subscribe();
        reg.upsert(light("a"));
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn concurrent_updates_to_one_device_are_serialized() {
        let reg = Arc::new(DeviceRegistry::new());
        let d = light("x");
        let id = d.id.clone();
        reg.upsert(d);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        reg.update(&id, |d| d.fail_count += 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.get(&id).unwrap().fail_count(), 800);
    }
}
