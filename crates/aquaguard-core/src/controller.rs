// ── Controller facade ──
//
// Owns the poll orchestrator together with the change log and the push
// notifier it was wired to. CLI commands talk to this type only.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::changelog::{ChangeLog, ChangeLogSink};
use crate::client::CloudPlatform;
use crate::command::{Command, CommandResult};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{ChangeLogEntry, Device, DeviceId, NotificationRules};
use crate::notify::{NotificationSink, PushNotifier, PushSettings};
use crate::orchestrator::{CycleReport, PollOrchestrator, StatusCallback};
use crate::registry::DeviceRegistry;

/// Collaborators handed to [`Controller::new`].
#[derive(Default)]
pub struct ControllerParts {
    pub devices: Vec<Device>,
    pub change_log: ChangeLog,
    pub notifier: Option<PushNotifier>,
    pub cloud: Option<Arc<dyn CloudPlatform>>,
    pub on_status: Option<StatusCallback>,
}

/// The main entry point for consumers of the engine.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Mutations go through
/// [`execute`](Self::execute); reads return registry or log snapshots.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    orchestrator: PollOrchestrator,
    change_log: Arc<ChangeLog>,
    notifier: Option<Arc<PushNotifier>>,
}

impl Controller {
    pub fn new(config: EngineConfig, parts: ControllerParts) -> Result<Self, CoreError> {
        let registry = Arc::new(DeviceRegistry::from_devices(parts.devices));
        let change_log = Arc::new(parts.change_log);
        let notifier = parts.notifier.map(Arc::new);

        let log_sink: Arc<dyn ChangeLogSink> = change_log.clone();
        let mut builder = PollOrchestrator::builder(config).registry(registry).change_log(log_sink);
        if let Some(notifier) = &notifier {
            let push_sink: Arc<dyn NotificationSink> = notifier.clone();
            builder = builder.notifier(push_sink);
        }
        if let Some(cloud) = parts.cloud {
            builder = builder.cloud(cloud);
        }
        if let Some(callback) = parts.on_status {
            builder = builder.on_status(move |d: &Device| callback(d));
        }

        Ok(Self {
            inner: Arc::new(ControllerInner {
                orchestrator: builder.build()?,
                change_log,
                notifier,
            }),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start background polling.
    pub async fn start(&self) {
        if !self.inner.orchestrator.start().await {
            debug!("polling already running");
        }
    }

    /// Stop background polling, waiting at most `timeout`.
    pub async fn stop(&self, timeout: Duration) -> bool {
        let stopped = self.inner.orchestrator.stop(timeout).await;
        info!(stopped, "controller stopped");
        stopped
    }

    /// Run one poll cycle in the foreground.
    pub async fn refresh(&self) -> CycleReport {
        self.inner.orchestrator.run_cycle().await
    }

    // ── Snapshots ────────────────────────────────────────────────

    pub fn orchestrator(&self) -> &PollOrchestrator {
        &self.inner.orchestrator
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        self.inner.orchestrator.registry()
    }

    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.registry().list()
    }

    pub fn device(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.registry().get(id)
    }

    pub fn change_log(&self) -> &Arc<ChangeLog> {
        &self.inner.change_log
    }

    pub fn log_entries(&self) -> Vec<ChangeLogEntry> {
        self.inner.change_log.entries()
    }

    pub fn notification_rules(&self) -> Arc<NotificationRules> {
        self.inner.orchestrator.detector().rules()
    }

    pub fn is_cloud_logged_in(&self) -> bool {
        self.inner.orchestrator.is_cloud_logged_in()
    }

    /// Replace the push settings. A controller built without a notifier
    /// ignores this.
    pub fn configure_push(&self, settings: PushSettings) {
        if let Some(notifier) = &self.inner.notifier {
            notifier.configure(settings);
        }
    }

    // ── Command execution ────────────────────────────────────────

    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let orch = &self.inner.orchestrator;
        match cmd {
            Command::AddDevice(req) => orch.add_device(req.into_device()).map(CommandResult::Device),
            Command::RemoveDevice { id } => orch.remove_device(&id).map(CommandResult::Device),
            Command::UpdateDevice { id, update } => orch.update_device(&id, update).map(CommandResult::Device),
            Command::SyncCloudDevices => orch.sync_cloud_devices().await.map(CommandResult::Count),

            Command::PollNow { id } => orch.poll_now(&id).await.map(CommandResult::Polled),
            Command::SetPollInterval { ms } => Ok(CommandResult::Interval(orch.set_poll_interval(ms))),

            Command::SetPower { id, on } => orch.set_power(&id, on).await.map(CommandResult::Accepted),
            Command::SetColor { id, r, g, b } => orch.set_color(&id, r, g, b).await.map(CommandResult::Accepted),
            Command::SetMode { id, mode } => orch.set_mode(&id, mode).await.map(CommandResult::Accepted),
            Command::ApplyScene { id, scene } => orch.apply_scene(&id, scene).await.map(CommandResult::Accepted),

            Command::SetNotificationRules { rules } => {
                orch.set_notification_rules(rules);
                Ok(CommandResult::Ok)
            }
            Command::SetChangeLogging { enabled } => {
                orch.set_change_logging(enabled);
                Ok(CommandResult::Ok)
            }
            Command::MarkLogRead { id } => Ok(CommandResult::Accepted(self.inner.change_log.mark_read(id))),
            Command::MarkAllLogsRead => {
                self.inner.change_log.mark_all_read();
                Ok(CommandResult::Ok)
            }
            Command::ClearLog => {
                self.inner.change_log.clear();
                Ok(CommandResult::Ok)
            }
        }
    }
}
