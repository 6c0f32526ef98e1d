#![allow(clippy::unwrap_used)]
// End-to-end tests for the poll orchestrator: wiremock HTTP nodes and an
// in-process fake cloud platform.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aquaguard_api::CloudDevice;
use aquaguard_core::{
    ChangeLog, CloudPlatform, CoreError, Device, DeviceId, DeviceKind, EngineConfig, NotificationRule,
    NotificationRules, NotificationSink, PollError, PollOrchestrator, PowerAction, WireCoordinate,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeCloud {
    logged_in: AtomicBool,
    listed: Mutex<Vec<CloudDevice>>,
    props: Mutex<HashMap<(String, u32, u32), Value>>,
    reads: Mutex<Vec<String>>,
    writes: AtomicUsize,
}

impl FakeCloud {
    fn logged_in() -> Arc<Self> {
        let fake = Arc::new(Self::default());
        fake.logged_in.store(true, Ordering::SeqCst);
        fake
    }

    fn list(&self, did: &str, online: bool) {
        let mut listed = self.listed.lock().unwrap();
        listed.retain(|d| d.did != did);
        listed.push(CloudDevice {
            did: did.into(),
            name: format!("device {did}"),
            model: "chuangmi.plug.v3".into(),
            is_online: online,
        });
    }

    fn set(&self, did: &str, siid: u32, piid: u32, value: Value) {
        self.props.lock().unwrap().insert((did.into(), siid, piid), value);
    }

    fn reads_of(&self, did: &str) -> usize {
        self.reads.lock().unwrap().iter().filter(|d| *d == did).count()
    }
}

#[async_trait]
impl CloudPlatform for FakeCloud {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn list_devices(&self) -> Result<Vec<CloudDevice>, PollError> {
        Ok(self.listed.lock().unwrap().clone())
    }

    async fn read_property(&self, did: &str, at: WireCoordinate) -> Result<Value, PollError> {
        self.reads.lock().unwrap().push(did.to_owned());
        self.props
            .lock()
            .unwrap()
            .get(&(did.to_owned(), at.service_instance, at.property_instance))
            .cloned()
            .ok_or(PollError::Timeout)
    }

    async fn write_property(&self, did: &str, at: WireCoordinate, value: Value) -> Result<bool, PollError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.set(did, at.service_instance, at.property_instance, value);
        Ok(true)
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl NotificationSink for Recorder {
    fn send(&self, title: &str, _body: &str) -> bool {
        self.0.lock().unwrap().push(title.to_owned());
        true
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        status_ttl: Duration::ZERO,
        node_timeout: Duration::from_millis(500),
        change_logging: true,
        ..EngineConfig::default()
    }
}

fn sensor_body() -> serde_json::Value {
    json!({
        "system": { "uptime": 10, "wifi_signal": -55 },
        "sensors": { "temperature": 25.0, "tds_value": 150, "water_level": 1, "alert_flag": false }
    })
}

async fn mount_status(server: &MockServer, status: u16) {
    server.reset().await;
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(sensor_body())
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(template)
        .mount(server)
        .await;
}

// ── Failure hysteresis ──────────────────────────────────────────────

#[tokio::test]
async fn test_offline_only_after_three_consecutive_failures() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let orch = PollOrchestrator::builder(config()).build().unwrap();
    let sensor = orch
        .add_device(Device::http("Tank sensor", DeviceKind::Sensor, server.uri()))
        .unwrap();

    let report = orch.run_cycle().await;
    assert_eq!(report.failed, 0);
    let d = orch.registry().get(&sensor.id).unwrap();
    assert!(d.online);
    assert_eq!(d.data["tds_value"], json!(150));

    mount_status(&server, 500).await;
    for expected in 1..=2 {
        let report = orch.run_cycle().await;
        assert_eq!(report.failed, 1);
        let d = orch.registry().get(&sensor.id).unwrap();
        assert!(d.online, "still online after {expected} failures");
        assert_eq!(d.fail_count(), expected);
    }
    orch.run_cycle().await;
    let d = orch.registry().get(&sensor.id).unwrap();
    assert!(!d.online);
    // Stale data is kept.
    assert_eq!(d.data["tds_value"], json!(150));

    mount_status(&server, 200).await;
    orch.run_cycle().await;
    let d = orch.registry().get(&sensor.id).unwrap();
    assert!(d.online);
    assert_eq!(d.fail_count(), 0);
}

// ── Target selection ────────────────────────────────────────────────

#[tokio::test]
async fn test_invisible_device_is_never_polled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sensor_body()))
        .expect(0)
        .mount(&server)
        .await;

    let orch = PollOrchestrator::builder(config()).build().unwrap();
    let mut hidden = Device::http("Hidden", DeviceKind::Sensor, server.uri());
    hidden.visible = false;
    orch.add_device(hidden).unwrap();

    let report = orch.run_cycle().await;
    assert_eq!(report.targets, 0);
}

#[tokio::test]
async fn test_cloud_targets_follow_reachability() {
    let cloud = FakeCloud::logged_in();
    cloud.set("fresh", 2, 1, json!(true));
    cloud.set("gone", 2, 1, json!(true));

    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .build()
        .unwrap();
    orch.add_device(Device::cloud("Fresh", DeviceKind::MijiaSwitch, "fresh", None))
        .unwrap();
    let mut gone = Device::cloud("Gone", DeviceKind::MijiaSwitch, "gone", None);
    gone.last_seen = Some(Utc::now());
    gone.online = false;
    orch.add_device(gone).unwrap();

    let report = orch.run_cycle().await;

    assert_eq!(report.targets, 1);
    assert_eq!(cloud.reads_of("fresh"), 1);
    assert_eq!(cloud.reads_of("gone"), 0);
}

#[tokio::test]
async fn test_bulk_pass_sets_reachability_and_reports_it() {
    let cloud = FakeCloud::logged_in();
    cloud.list("42", false);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .on_status(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let mut plug = Device::cloud("Plug", DeviceKind::MijiaSwitch, "42.s2", None);
    plug.online = true;
    plug.last_seen = Some(Utc::now());
    let plug = orch.add_device(plug).unwrap();

    let report = orch.run_cycle().await;

    assert_eq!(report.bulk_reported, Some(1));
    assert!(!orch.registry().get(&plug.id).unwrap().online);
    // Known and offline: no detail poll this cycle.
    assert_eq!(report.targets, 0);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// ── Not-logged-in path ──────────────────────────────────────────────

#[tokio::test]
async fn test_logged_out_cloud_devices_are_untouched() {
    let cloud = Arc::new(FakeCloud::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .on_status(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();
    let lamp = orch
        .add_device(Device::cloud("Lamp", DeviceKind::MijiaLight, "7", None))
        .unwrap();

    orch.run_cycle().await;
    let outcome = orch.poll_now(&lamp.id).await.unwrap();

    assert_eq!(outcome.error, Some(PollError::NotAuthenticated));
    let d = orch.registry().get(&lamp.id).unwrap();
    assert_eq!(d.fail_count(), 0);
    assert!(d.last_seen.is_none());
    assert_eq!(cloud.reads_of("7"), 0);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_skipped_polls_are_not_failures() {
    let cloud = Arc::new(FakeCloud::default());
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .build()
        .unwrap();
    orch.add_device(Device::cloud("Lamp", DeviceKind::MijiaLight, "7", None))
        .unwrap();

    let report = orch.run_cycle().await;
    assert_eq!(report.failed, 0);
    assert!(report.transitions.is_empty());
}

// ── Change detection end to end ─────────────────────────────────────

#[tokio::test]
async fn test_switch_flip_is_logged_and_pushed_once() {
    let cloud = FakeCloud::logged_in();
    cloud.list("555", true);
    cloud.set("555", 2, 1, json!(false));

    let log = Arc::new(ChangeLog::in_memory());
    let push = Arc::new(Recorder::default());
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .change_log(log.clone())
        .notifier(push.clone())
        .build()
        .unwrap();

    let gang = orch
        .add_device(Device::cloud("Pump", DeviceKind::MijiaSwitch, "555.s2", None))
        .unwrap();
    orch.set_notification_rules(NotificationRules::from([(
        gang.id.clone(),
        NotificationRule {
            notify_on: true,
            notify_off: false,
        },
    )]));

    // Baseline only.
    let first = orch.run_cycle().await;
    assert!(first.transitions.is_empty());
    assert!(log.is_empty());

    cloud.set("555", 2, 1, json!(true));
    let second = orch.run_cycle().await;
    assert_eq!(second.transitions.len(), 1);
    assert_eq!(second.transitions[0].action, PowerAction::On);
    assert_eq!(push.0.lock().unwrap().as_slice(), ["Heads up: Pump turned on"]);

    // Steady state afterwards.
    orch.run_cycle().await;
    assert_eq!(log.len(), 1);

    // Off is logged but the rule does not push it.
    cloud.set("555", 2, 1, json!(false));
    orch.run_cycle().await;
    assert_eq!(log.len(), 2);
    assert_eq!(push.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_first_read_does_not_seed_baseline() {
    let cloud = FakeCloud::logged_in();
    cloud.list("777", true);

    let log = Arc::new(ChangeLog::in_memory());
    let push = Arc::new(Recorder::default());
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .change_log(log.clone())
        .notifier(push.clone())
        .build()
        .unwrap();
    let lamp = orch
        .add_device(Device::cloud("Lamp", DeviceKind::MijiaLight, "777", None))
        .unwrap();
    orch.set_notification_rules(NotificationRules::from([(
        lamp.id.clone(),
        NotificationRule {
            notify_on: true,
            notify_off: true,
        },
    )]));

    // The power read times out: nothing is known yet.
    let first = orch.run_cycle().await;
    assert_eq!(first.failed, 1);
    assert!(first.transitions.is_empty());
    assert_eq!(orch.detector().last_known(&lamp.id), None);

    // The lamp was on all along; its first reading is only a baseline.
    cloud.set("777", 2, 1, json!(true));
    let second = orch.run_cycle().await;
    assert_eq!(second.failed, 0);
    assert!(second.transitions.is_empty());
    assert!(log.is_empty());
    assert!(push.0.lock().unwrap().is_empty());
    assert_eq!(orch.detector().last_known(&lamp.id), Some(true));
}

#[tokio::test]
async fn test_login_after_startup_does_not_push_devices_already_on() {
    let offline = Arc::new(FakeCloud::default());
    let log = Arc::new(ChangeLog::in_memory());
    let push = Arc::new(Recorder::default());
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&offline) as Arc<dyn CloudPlatform>)
        .change_log(log.clone())
        .notifier(push.clone())
        .build()
        .unwrap();
    let plug = orch
        .add_device(Device::cloud("Heater", DeviceKind::MijiaSwitch, "888", None))
        .unwrap();
    orch.set_notification_rules(NotificationRules::from([(
        plug.id.clone(),
        NotificationRule {
            notify_on: true,
            notify_off: true,
        },
    )]));

    // Not logged in: cloud polls are skipped.
    let first = orch.run_cycle().await;
    assert!(first.transitions.is_empty());
    assert_eq!(orch.detector().last_known(&plug.id), None);

    let cloud = FakeCloud::logged_in();
    cloud.list("888", true);
    cloud.set("888", 2, 1, json!(true));
    orch.set_cloud(Some(Arc::clone(&cloud) as Arc<dyn CloudPlatform>));

    let second = orch.run_cycle().await;
    assert!(second.transitions.is_empty());
    assert!(log.is_empty());
    assert!(push.0.lock().unwrap().is_empty());
    assert_eq!(orch.detector().last_known(&plug.id), Some(true));

    // Real flips are still caught.
    cloud.set("888", 2, 1, json!(false));
    let third = orch.run_cycle().await;
    assert_eq!(third.transitions.len(), 1);
    assert_eq!(third.transitions[0].action, PowerAction::Off);
    assert_eq!(push.0.lock().unwrap().as_slice(), ["Heads up: Heater turned off"]);
}

// ── On-demand poll & control ────────────────────────────────────────

#[tokio::test]
async fn test_poll_now_reports_connection_refused() {
    let orch = PollOrchestrator::builder(config()).build().unwrap();
    let dead = orch
        .add_device(Device::http("Dead node", DeviceKind::Light, "127.0.0.1:9"))
        .unwrap();

    let outcome = orch.poll_now(&dead.id).await.unwrap();

    assert!(matches!(
        outcome.error,
        Some(PollError::ConnectionRefused | PollError::Timeout)
    ));
    assert_eq!(outcome.device.fail_count(), 1);
}

#[tokio::test]
async fn test_virtual_switch_power_writes_through_resolver() {
    let cloud = FakeCloud::logged_in();
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .build()
        .unwrap();
    let gang = orch
        .add_device(Device::cloud("Heater", DeviceKind::MijiaSwitch, "900.s3", None))
        .unwrap();

    assert!(orch.set_power(&gang.id, true).await.unwrap());
    assert_eq!(cloud.writes.load(Ordering::SeqCst), 1);

    let outcome = orch.poll_now(&gang.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.device.data["is_on"], json!(true));

    // Colour is a light-node feature.
    assert!(!orch.set_color(&gang.id, 1, 2, 3).await.unwrap());
}

#[tokio::test]
async fn test_sync_adds_only_unknown_devices() {
    let cloud = FakeCloud::logged_in();
    cloud.list("1", true);
    cloud.list("2", false);
    let orch = PollOrchestrator::builder(config())
        .cloud(Arc::clone(&cloud) as Arc<dyn CloudPlatform>)
        .build()
        .unwrap();
    orch.add_device(Device::cloud("Known", DeviceKind::MijiaSwitch, "1", None))
        .unwrap();

    assert_eq!(orch.sync_cloud_devices().await.unwrap(), 1);
    let added = orch.registry().find_by_external_id("2").unwrap();
    assert_eq!(added.kind, DeviceKind::MijiaSwitch);
    assert!(!added.online);
    assert_eq!(orch.sync_cloud_devices().await.unwrap(), 0);
}

#[tokio::test]
async fn test_remove_forgets_baseline() {
    let orch = PollOrchestrator::builder(config()).build().unwrap();
    let d = orch
        .add_device(Device::http("Strip", DeviceKind::Light, "10.0.0.9"))
        .unwrap();
    let mut seen = (*d).clone();
    seen.data.insert("power".into(), json!("on"));
    orch.detector().observe(&seen);
    assert!(orch.detector().last_known(&d.id).is_some());

    orch.remove_device(&d.id).unwrap();
    assert!(orch.detector().last_known(&d.id).is_none());
    assert!(matches!(
        orch.remove_device(&DeviceId::from(d.id.as_str())),
        Err(CoreError::DeviceNotFound { .. })
    ));
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_background_loop_polls_and_stops() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let orch = PollOrchestrator::builder(config()).build().unwrap();
    let sensor = orch
        .add_device(Device::http("Tank", DeviceKind::Sensor, server.uri()))
        .unwrap();

    assert!(orch.start().await);
    for _ in 0..50 {
        if orch.registry().get(&sensor.id).unwrap().online {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(orch.registry().get(&sensor.id).unwrap().online);
    assert!(orch.stop(Duration::from_secs(2)).await);
}
