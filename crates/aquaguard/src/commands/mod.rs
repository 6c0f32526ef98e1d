//! Command handlers and the engine context they share.

pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod logs;
pub mod poll;
pub mod rules;
pub mod run;
pub mod util;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use aquaguard_api::{CloudClient, CloudSession, PushClient, TransportConfig};
use aquaguard_config::{CloudSettings, Config, config_path, load_config, resolve_relative, save_config};
use aquaguard_core::{ChangeLog, CloudPlatform, Controller, ControllerParts, CoreError, PushNotifier, StatusCallback};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Default change-log file, next to the config file.
const DEFAULT_STATUS_LOG: &str = "status_log.json";

/// Loaded config plus the controller built from it.
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub controller: Controller,
}

impl Context {
    /// Load config and wire the engine. Nothing is polled yet.
    pub fn build(global: &GlobalOpts, on_status: Option<StatusCallback>) -> Result<Self, CliError> {
        let config_path = resolve_config_path(global);
        let config = load_config(&config_path)?;
        let missing_ids = config.devices.iter().any(|d| d.id.is_none());

        let log_file = config
            .status_log
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATUS_LOG));
        let change_log = ChangeLog::open(resolve_relative(&config_path, &log_file))?;

        let push_url = Url::parse(&config.notification.base_url).map_err(|e| CliError::Validation {
            field: "notification.base_url".into(),
            reason: e.to_string(),
        })?;
        let push = PushClient::new(push_url, &TransportConfig::cloud()).map_err(CoreError::from)?;
        let notifier = PushNotifier::new(push, config.push_settings());

        let cloud = if config.cloud.enabled {
            connect_cloud(&config_path, &config.cloud)
        } else {
            None
        };

        let controller = Controller::new(
            config.engine_config(),
            ControllerParts {
                devices: config.devices(),
                change_log,
                notifier: Some(notifier),
                cloud,
                on_status,
            },
        )?;
        debug!(path = %config_path.display(), devices = controller.devices().len(), "engine ready");

        let mut ctx = Self {
            config_path,
            config,
            controller,
        };
        // Rules and log entries refer to ids, so generated ones must stick.
        if missing_ids {
            ctx.save()?;
        }
        Ok(ctx)
    }

    /// Write the registry's device list and the active rules back to the
    /// config file.
    pub fn save(&mut self) -> Result<(), CliError> {
        self.config.set_devices(&self.controller.devices());
        self.config
            .set_notification_rules(&self.controller.notification_rules());
        save_config(&self.config_path, &self.config)?;
        Ok(())
    }
}

pub fn resolve_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Restore the cloud session. Any failure leaves the engine logged out.
fn connect_cloud(config_path: &Path, settings: &CloudSettings) -> Option<Arc<dyn CloudPlatform>> {
    let auth_file = resolve_relative(config_path, &settings.auth_path);
    let session = match CloudSession::load(&auth_file) {
        Ok(session) => session,
        Err(e) => {
            warn!(path = %auth_file.display(), error = %e, "cloud session unavailable");
            return None;
        }
    };
    let client = Url::parse(&settings.base_url)
        .map_err(aquaguard_api::Error::from)
        .and_then(|base| CloudClient::new(base, &session, &TransportConfig::cloud()));
    match client {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "cloud client could not be built");
            None
        }
    }
}

/// Route an engine-backed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Devices(args) => devices::handle(args, &mut Context::build(global, None)?, global).await,
        Command::Poll(args) => poll::handle(args, &Context::build(global, None)?, global).await,
        Command::Power(args) => control::power(args, &Context::build(global, None)?, global).await,
        Command::Light(args) => control::light(args, &Context::build(global, None)?, global).await,
        Command::Rules(args) => rules::handle(args, &mut Context::build(global, None)?, global).await,
        Command::Logs(args) => logs::handle(args, &Context::build(global, None)?, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}
