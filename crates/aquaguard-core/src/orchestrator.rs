// ── Poll orchestrator ──
//
// One background loop drives the poll cycle:
//
//   1. bulk reachability pass (one cloud call, authoritative `online`)
//   2. target selection
//   3. bounded fan-out of per-device detail polls, joined before moving on
//   4. change detection over the post-cycle registry snapshot
//
// Cycles never overlap. On-demand polls run on their own task and race
// the loop only at the registry, where per-device updates are atomic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use aquaguard_api::{LightMode, Scene, TransportConfig};
use arc_swap::ArcSwapOption;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::cache::StatusCache;
use crate::changelog::{ChangeLog, ChangeLogSink};
use crate::client::{CloudPlatform, DeviceClient};
use crate::config::{EngineConfig, clamp_interval};
use crate::detector::{ChangeDetector, Transition};
use crate::error::{CoreError, PollError};
use crate::failure::FailureTracker;
use crate::model::{Device, DeviceCategory, DeviceId, DeviceUpdate, NotificationRules, TransportKind};
use crate::notify::NotificationSink;
use crate::pool::{PoolReport, WorkerPool};
use crate::registry::DeviceRegistry;
use crate::resolver::VirtualAddress;

/// Invoked with the updated snapshot after every poll outcome.
/// Called from worker tasks; must not block.
pub type StatusCallback = Arc<dyn Fn(&Device) + Send + Sync>;

/// Sink that drops every notification.
struct Silent;

impl NotificationSink for Silent {
    fn send(&self, _title: &str, _body: &str) -> bool {
        false
    }
}

// ── Reports ──────────────────────────────────────────────────────

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Devices reported by the bulk pass, `None` if it did not run.
    pub bulk_reported: Option<usize>,
    pub targets: usize,
    pub pool: PoolReport,
    /// Detail polls that ended in a device failure. Skipped cloud polls
    /// are not counted.
    pub failed: usize,
    pub transitions: Vec<Transition>,
}

/// Result of a single device poll.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub device: Arc<Device>,
    pub error: Option<PollError>,
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ── Builder ──────────────────────────────────────────────────────

/// Assembles a [`PollOrchestrator`] from its collaborators.
pub struct OrchestratorBuilder {
    config: EngineConfig,
    registry: Option<Arc<DeviceRegistry>>,
    cloud: Option<Arc<dyn CloudPlatform>>,
    change_log: Option<Arc<dyn ChangeLogSink>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    on_status: Option<StatusCallback>,
    http: Option<reqwest::Client>,
}

impl OrchestratorBuilder {
    pub fn registry(mut self, registry: Arc<DeviceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cloud(mut self, cloud: Arc<dyn CloudPlatform>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn change_log(mut self, log: Arc<dyn ChangeLogSink>) -> Self {
        self.change_log = Some(log);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Device) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }

    /// HTTP client shared by every node poll. Built from the config's
    /// node timeout when not supplied.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<PollOrchestrator, CoreError> {
        let http = match self.http {
            Some(http) => http,
            None => TransportConfig::default()
                .with_timeout(self.config.node_timeout)
                .build_client()
                .map_err(|e| CoreError::Internal(e.to_string()))?,
        };
        let config = self.config;

        Ok(PollOrchestrator {
            inner: Arc::new(OrchestratorInner {
                registry: self.registry.unwrap_or_default(),
                cache: StatusCache::new(),
                status_ttl: config.status_ttl,
                tracker: FailureTracker::new(config.offline_threshold),
                detector: ChangeDetector::new(config.notification_rules, config.change_logging),
                pool: WorkerPool::new(config.max_workers),
                cloud: ArcSwapOption::new(self.cloud.map(|platform| Arc::new(CloudLink { platform }))),
                http,
                change_log: self.change_log.unwrap_or_else(|| Arc::new(ChangeLog::in_memory())),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(Silent)),
                on_status: self.on_status,
                interval_ms: AtomicU64::new(clamp_interval(config.poll_interval_ms)),
                cycle_lock: Mutex::new(()),
                running: Mutex::new(None),
            }),
        })
    }
}

// ── PollOrchestrator ─────────────────────────────────────────────

struct CloudLink {
    platform: Arc<dyn CloudPlatform>,
}

/// Drives device polling. Cheaply cloneable.
#[derive(Clone)]
pub struct PollOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    registry: Arc<DeviceRegistry>,
    cache: StatusCache<Map<String, Value>>,
    status_ttl: Duration,
    tracker: FailureTracker,
    detector: ChangeDetector,
    pool: WorkerPool,
    cloud: ArcSwapOption<CloudLink>,
    http: reqwest::Client,
    change_log: Arc<dyn ChangeLogSink>,
    notifier: Arc<dyn NotificationSink>,
    on_status: Option<StatusCallback>,
    interval_ms: AtomicU64,
    /// Held for the whole of a cycle so cycles never overlap.
    cycle_lock: Mutex<()>,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl PollOrchestrator {
    pub fn builder(config: EngineConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            registry: None,
            cloud: None,
            change_log: None,
            notifier: None,
            on_status: None,
            http: None,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.inner.detector
    }

    pub fn tracker(&self) -> FailureTracker {
        self.inner.tracker
    }

    /// Current cloud platform handle, if a session was supplied.
    pub fn cloud(&self) -> Option<Arc<dyn CloudPlatform>> {
        self.inner.cloud.load_full().map(|link| Arc::clone(&link.platform))
    }

    /// Install or drop the cloud platform handle (login / logout).
    pub fn set_cloud(&self, cloud: Option<Arc<dyn CloudPlatform>>) {
        self.inner
            .cloud
            .store(cloud.map(|platform| Arc::new(CloudLink { platform })));
    }

    pub fn is_cloud_logged_in(&self) -> bool {
        self.cloud().is_some_and(|c| c.is_logged_in())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.inner.interval_ms.load(Ordering::Relaxed))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the background poll loop. Returns `false` if already running.
    pub async fn start(&self) -> bool {
        let mut running = self.inner.running.lock().await;
        if running.is_some() {
            return false;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(self.clone(), cancel.clone()));
        *running = Some((cancel, handle));
        info!(interval_ms = self.poll_interval().as_millis(), "polling started");
        true
    }

    /// Signal the loop to exit after its current cycle and wait up to
    /// `timeout` for it. Returns `true` if it exited in time.
    pub async fn stop(&self, timeout: Duration) -> bool {
        let Some((cancel, handle)) = self.inner.running.lock().await.take() else {
            return true;
        };
        cancel.cancel();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                info!("polling stopped");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "poll loop ended abnormally");
                true
            }
            Err(_) => {
                // In-flight node calls carry their own timeouts and drain on their own.
                warn!(timeout_ms = timeout.as_millis(), "poll loop did not stop in time");
                false
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.running.lock().await.is_some()
    }

    // ── Poll cycle ───────────────────────────────────────────────

    /// Run one full cycle now.
    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.inner.cycle_lock.lock().await;
        let mut report = CycleReport::default();

        let cloud = self.cloud().filter(|c| c.is_logged_in());
        if let Some(cloud) = &cloud {
            report.bulk_reported = self.bulk_reachability(cloud.as_ref()).await;
        }

        let snapshot = self.inner.registry.list();
        let targets = select_targets(&snapshot, cloud.is_some());
        report.targets = targets.len();
        trace!(targets = targets.len(), devices = snapshot.len(), "dispatching detail polls");

        let failed = Arc::new(AtomicUsize::new(0));
        report.pool = self
            .inner
            .pool
            .run_all(targets, |device| {
                let this = self.clone();
                let failed = Arc::clone(&failed);
                async move {
                    if this.poll_counted(&device).await {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .await;
        report.failed = failed.load(Ordering::Relaxed);

        let after = self.inner.registry.list();
        report.transitions = self.inner.detector.process(
            after.iter().map(AsRef::as_ref),
            self.inner.change_log.as_ref(),
            self.inner.notifier.as_ref(),
        );
        report
    }

    /// Apply the bulk device list's reachability to the registry.
    async fn bulk_reachability(&self, cloud: &dyn CloudPlatform) -> Option<usize> {
        let listed = match cloud.list_devices().await {
            Ok(listed) => listed,
            Err(e) => {
                warn!(error = %e, "bulk reachability pass failed");
                return None;
            }
        };
        let reachability: HashMap<&str, bool> = listed.iter().map(|d| (d.did.as_str(), d.is_online)).collect();

        for device in self.inner.registry.list() {
            let Some(external_id) = device.external_id.as_deref() else {
                continue;
            };
            let physical = VirtualAddress::parse(external_id).map(|v| v.physical_id);
            let key = physical.as_deref().unwrap_or(external_id);
            let Some(&online) = reachability.get(key) else {
                continue;
            };
            if device.online == online {
                continue;
            }
            if let Some(updated) = self.inner.registry.update(&device.id, |d| d.online = online) {
                debug!(device_id = %updated.id, online, "reachability changed");
                if updated.visible {
                    self.notify_status(&updated);
                }
            }
        }
        Some(listed.len())
    }

    /// Fan-out job: poll and report whether the device itself failed.
    async fn poll_counted(&self, device: &Device) -> bool {
        matches!(self.poll_device(device).await, Err(e) if e != PollError::NotAuthenticated)
    }

    /// Poll one device and write the outcome back.
    async fn poll_device(&self, device: &Device) -> Result<Arc<Device>, PollError> {
        let outcome = self.fetch_status(device).await;

        // Not being logged in is a precondition, not a device failure.
        if matches!(outcome, Err(PollError::NotAuthenticated)) {
            trace!(device_id = %device.id, "skipped: cloud session not authenticated");
            return Err(PollError::NotAuthenticated);
        }

        let tracker = self.inner.tracker;
        let updated = self.inner.registry.update(&device.id, |d| match &outcome {
            Ok(data) => {
                d.data.clone_from(data);
                tracker.success(d, Utc::now());
            }
            Err(_) => {
                tracker.failure(d);
            }
        });

        match &outcome {
            Ok(_) => trace!(device_id = %device.id, "poll ok"),
            Err(e) if e.is_transient() => debug!(device_id = %device.id, error = %e, "poll failed"),
            Err(e) => warn!(device_id = %device.id, error = %e, "poll failed"),
        }

        // Removed while the poll was in flight.
        let Some(updated) = updated else {
            return outcome.map(|_| Arc::new(device.clone()));
        };
        self.notify_status(&updated);
        outcome.map(|_| updated)
    }

    async fn fetch_status(&self, device: &Device) -> Result<Map<String, Value>, PollError> {
        let cloud = self.cloud();
        let client = DeviceClient::for_device(device, &self.inner.http, cloud.as_ref())?;
        match (&client, cache_key(device)) {
            (DeviceClient::Cloud(_), Some(key)) => {
                self.inner
                    .cache
                    .get_or_fetch(key, self.inner.status_ttl, || client.read_status())
                    .await
            }
            _ => client.read_status().await,
        }
    }

    fn notify_status(&self, device: &Device) {
        if let Some(callback) = &self.inner.on_status {
            callback(device);
        }
    }

    /// Poll one device immediately on its own task.
    pub async fn poll_now(&self, id: &DeviceId) -> Result<PollOutcome, CoreError> {
        let device = self.device(id)?;
        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = this.poll_device(&device).await;
            (device, result)
        });
        let (device, result) = task.await.map_err(|e| CoreError::Internal(e.to_string()))?;
        match result {
            Ok(updated) => Ok(PollOutcome {
                device: updated,
                error: None,
            }),
            Err(error) => Ok(PollOutcome {
                device: self.inner.registry.get(&device.id).unwrap_or(device),
                error: Some(error),
            }),
        }
    }

    // ── Administrative surface ───────────────────────────────────

    /// Register a new device. It is picked up from the next cycle.
    pub fn add_device(&self, device: Device) -> Result<Arc<Device>, CoreError> {
        validate(&device)?;
        if self.inner.registry.get(&device.id).is_some() {
            return Err(CoreError::ValidationFailed {
                message: format!("device id {} already exists", device.id),
            });
        }
        let id = device.id.clone();
        info!(device_id = %id, name = %device.name, kind = %device.kind, "device added");
        self.inner.registry.upsert(device);
        self.device(&id)
    }

    pub fn remove_device(&self, id: &DeviceId) -> Result<Arc<Device>, CoreError> {
        let removed = self.inner.registry.remove(id).ok_or_else(|| not_found(id))?;
        self.inner.detector.forget(id);
        if let Some(key) = cache_key(&removed) {
            self.inner.cache.invalidate(key);
        }
        info!(device_id = %id, name = %removed.name, "device removed");
        Ok(removed)
    }

    pub fn update_device(&self, id: &DeviceId, update: DeviceUpdate) -> Result<Arc<Device>, CoreError> {
        if update.address.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(CoreError::ValidationFailed {
                message: "address cannot be empty".into(),
            });
        }
        self.inner
            .registry
            .update(id, |d| update.apply(d))
            .ok_or_else(|| not_found(id))
    }

    /// Set the interval used from the next sleep on. Returns the
    /// effective (clamped) value.
    pub fn set_poll_interval(&self, ms: u64) -> u64 {
        let effective = clamp_interval(ms);
        if effective != ms {
            debug!(requested = ms, effective, "poll interval clamped");
        }
        self.inner.interval_ms.store(effective, Ordering::Relaxed);
        effective
    }

    pub fn set_notification_rules(&self, rules: NotificationRules) {
        debug!(count = rules.len(), "notification rules replaced");
        self.inner.detector.set_rules(rules);
    }

    pub fn set_change_logging(&self, enabled: bool) {
        self.inner.detector.set_logging(enabled);
    }

    /// Add every cloud device not yet in the registry. Returns how many
    /// were added.
    pub async fn sync_cloud_devices(&self) -> Result<usize, CoreError> {
        let cloud = self
            .cloud()
            .filter(|c| c.is_logged_in())
            .ok_or(CoreError::NotAuthenticated)?;
        let listed = cloud.list_devices().await?;

        let mut added = 0;
        for entry in listed {
            if self.inner.registry.find_by_external_id(&entry.did).is_some() {
                continue;
            }
            let kind = DeviceCategory::infer(&entry.model, &entry.name).cloud_kind();
            let model = (!entry.model.is_empty()).then_some(entry.model);
            let mut device = Device::cloud(entry.name, kind, entry.did, model);
            device.online = entry.is_online;
            debug!(device_id = %device.id, name = %device.name, %kind, "discovered cloud device");
            self.inner.registry.upsert(device);
            added += 1;
        }
        info!(added, "cloud device sync complete");
        Ok(added)
    }

    // ── Control ──────────────────────────────────────────────────

    pub async fn set_power(&self, id: &DeviceId, on: bool) -> Result<bool, CoreError> {
        self.control(id, "set_power", |client| async move { client.set_power(on).await })
            .await
    }

    pub async fn set_color(&self, id: &DeviceId, r: u8, g: u8, b: u8) -> Result<bool, CoreError> {
        self.control(id, "set_color", |client| async move { client.set_color(r, g, b).await })
            .await
    }

    pub async fn set_mode(&self, id: &DeviceId, mode: LightMode) -> Result<bool, CoreError> {
        self.control(id, "set_mode", |client| async move { client.set_mode(mode).await })
            .await
    }

    pub async fn apply_scene(&self, id: &DeviceId, scene: Scene) -> Result<bool, CoreError> {
        self.control(id, "apply_scene", |client| async move { client.apply_scene(scene).await })
            .await
    }

    /// Run a control write. Every failure below "unknown device" is
    /// reported as `Ok(false)`.
    async fn control<F, Fut>(&self, id: &DeviceId, operation: &str, f: F) -> Result<bool, CoreError>
    where
        F: FnOnce(DeviceClient) -> Fut,
        Fut: std::future::Future<Output = Result<bool, PollError>>,
    {
        let device = self.device(id)?;
        let cloud = self.cloud();
        let result = match DeviceClient::for_device(&device, &self.inner.http, cloud.as_ref()) {
            Ok(client) => f(client).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(accepted) => {
                if let Some(key) = cache_key(&device).filter(|_| accepted) {
                    self.inner.cache.invalidate(key);
                }
                debug!(device_id = %id, operation, accepted, "control write");
                Ok(accepted)
            }
            Err(e) => {
                warn!(device_id = %id, operation, error = %e, "control write failed");
                Ok(false)
            }
        }
    }

    fn device(&self, id: &DeviceId) -> Result<Arc<Device>, CoreError> {
        self.inner.registry.get(id).ok_or_else(|| not_found(id))
    }
}

// ── Helpers ──────────────────────────────────────────────────────

async fn poll_loop(orchestrator: PollOrchestrator, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let report = orchestrator.run_cycle().await;
        trace!(
            targets = report.targets,
            panicked = report.pool.panicked,
            transitions = report.transitions.len(),
            "cycle complete"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(orchestrator.poll_interval()) => {}
        }
    }
    debug!("poll loop exited");
}

/// Devices that get a detail poll this cycle.
///
/// Invisible devices never do. HTTP nodes always do. Cloud devices do
/// when a session is active and they are online or have never been
/// polled successfully.
pub fn select_targets(devices: &[Arc<Device>], cloud_logged_in: bool) -> Vec<Device> {
    devices
        .iter()
        .filter(|d| d.visible)
        .filter(|d| match d.transport_kind() {
            TransportKind::HttpSensor | TransportKind::HttpLight => true,
            TransportKind::Cloud => cloud_logged_in && (d.online || d.last_seen.is_none()),
        })
        .map(|d| (**d).clone())
        .collect()
}

fn cache_key(device: &Device) -> Option<&str> {
    if device.is_cloud() {
        device.external_id.as_deref()
    } else {
        None
    }
}

fn validate(device: &Device) -> Result<(), CoreError> {
    let missing = |field: &str| CoreError::ValidationFailed {
        message: format!("{} device requires {field}", device.kind),
    };
    if device.is_cloud() {
        if device.external_id.as_deref().is_none_or(str::is_empty) {
            return Err(missing("a cloud id"));
        }
    } else if device.address.as_deref().is_none_or(|a| a.trim().is_empty()) {
        return Err(missing("an address"));
    }
    Ok(())
}

fn not_found(id: &DeviceId) -> CoreError {
    CoreError::DeviceNotFound {
        identifier: id.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceKind;

    fn arc(d: Device) -> Arc<Device> {
        Arc::new(d)
    }

    #[test]
    fn invisible_devices_are_never_targets() {
        let mut d = Device::http("n", DeviceKind::Sensor, "10.0.0.1");
        d.visible = false;
        d.online = true;
        assert!(select_targets(&[arc(d)], true).is_empty());
    }

    #[test]
    fn never_seen_cloud_device_is_target_even_if_offline() {
        let d = Device::cloud("c", DeviceKind::MijiaSwitch, "1", None);
        assert_eq!(select_targets(&[arc(d)], true).len(), 1);
    }

    #[test]
    fn known_offline_cloud_device_is_skipped() {
        let mut d = Device::cloud("c", DeviceKind::MijiaSwitch, "1", None);
        d.last_seen = Some(Utc::now());
        d.online = false;
        assert!(select_targets(&[arc(d)], true).is_empty());
    }

    #[test]
    fn cloud_devices_wait_for_a_session() {
        let d = Device::cloud("c", DeviceKind::MijiaSwitch, "1", None);
        let h = Device::http("n", DeviceKind::Light, "10.0.0.1");
        let targets = select_targets(&[arc(d), arc(h)], false);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, DeviceKind::Light);
    }

    #[test]
    fn validation_requires_identity() {
        let mut d = Device::http("n", DeviceKind::Light, "");
        assert!(validate(&d).is_err());
        d.address = Some("10.0.0.2".into());
        assert!(validate(&d).is_ok());

        let mut c = Device::cloud("c", DeviceKind::Mijia, "", None);
        assert!(validate(&c).is_err());
        c.external_id = Some("42".into());
        assert!(validate(&c).is_ok());
    }

    #[tokio::test]
    async fn interval_is_clamped() {
        let orch = PollOrchestrator::builder(EngineConfig::default()).build().unwrap();
        assert_eq!(orch.set_poll_interval(250), 1000);
        assert_eq!(orch.poll_interval(), Duration::from_millis(1000));
        assert_eq!(orch.set_poll_interval(5000), 5000);
    }

    #[tokio::test]
    async fn admin_calls_on_unknown_ids_fail_cleanly() {
        let orch = PollOrchestrator::builder(EngineConfig::default()).build().unwrap();
        let id = DeviceId::from("nope");
        assert!(matches!(orch.remove_device(&id), Err(CoreError::DeviceNotFound { .. })));
        assert!(matches!(orch.poll_now(&id).await, Err(CoreError::DeviceNotFound { .. })));
        assert!(matches!(orch.set_power(&id, true).await, Err(CoreError::DeviceNotFound { .. })));
    }

    #[tokio::test]
    async fn start_and_stop() {
        let orch = PollOrchestrator::builder(EngineConfig::default()).build().unwrap();
        assert!(orch.start().await);
        assert!(!orch.start().await);
        assert!(orch.stop(Duration::from_secs(2)).await);
        assert!(!orch.is_running().await);
    }
}
