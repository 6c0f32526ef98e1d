//! Configuration for AquaGuard.
//!
//! TOML file + `AQUAGUARD_` environment overrides, push-token resolution
//! (env + keyring + plaintext), translation to `aquaguard_core::EngineConfig`,
//! and persistence of the device list.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aquaguard_api::cloud::DEFAULT_CLOUD_BASE_URL;
use aquaguard_api::push::DEFAULT_PUSH_BASE_URL;
use aquaguard_core::config::clamp_interval;
use aquaguard_core::{
    DEFAULT_POLL_INTERVAL_MS, Device, DeviceId, DeviceKind, EngineConfig, MAX_WORKERS, NotificationRule,
    NotificationRules, PushSettings,
};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "aquaguard";

/// Environment variable consulted for the push token when no `token_env`
/// is configured.
pub const PUSH_TOKEN_ENV: &str = "AQUAGUARD_PUSH_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub cloud: CloudSettings,

    #[serde(default)]
    pub notification: NotificationSettings,

    #[serde(default)]
    pub status_log: StatusLogSettings,

    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Poll interval; values below 1000 are raised to 1000.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// Per-call timeout for HTTP nodes.
    #[serde(default = "default_node_timeout")]
    pub node_timeout_ms: u64,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            node_timeout_ms: default_node_timeout(),
            max_workers: default_max_workers(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_node_timeout() -> u64 {
    3000
}
fn default_max_workers() -> usize {
    MAX_WORKERS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,

    /// Session file with `userId`, `ssecurity` and `serviceToken`.
    /// Relative paths resolve against the config directory.
    #[serde(default = "default_auth_path")]
    pub auth_path: PathBuf,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_cloud_base_url(),
            auth_path: default_auth_path(),
        }
    }
}

fn default_cloud_base_url() -> String {
    DEFAULT_CLOUD_BASE_URL.into()
}
fn default_auth_path() -> PathBuf {
    PathBuf::from(".mijia-api-data/auth.json")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Push token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the push token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default = "default_push_base_url")]
    pub base_url: String,

    /// Per-device opt-in, keyed by device id.
    #[serde(default)]
    pub rules: HashMap<String, NotificationRule>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            token_env: None,
            base_url: default_push_base_url(),
            rules: HashMap::new(),
        }
    }
}

fn default_push_base_url() -> String {
    DEFAULT_PUSH_BASE_URL.into()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusLogSettings {
    /// Record power transitions in the change log.
    #[serde(default)]
    pub enabled: bool,

    /// Where the change log is persisted. Relative paths resolve against
    /// the config directory; the CLI uses `status_log.json` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// One `[[devices]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Generated on load when missing, then persisted by the next save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: DeviceKind,

    /// `host[:port]` of an HTTP node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Cloud platform id, possibly `<did>.s<n>` for one gang of a switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_device_name() -> String {
    "Unnamed device".into()
}
fn default_visible() -> bool {
    true
}

impl DeviceEntry {
    pub fn to_device(&self) -> Device {
        let mut device = if self.kind.is_cloud() {
            Device::cloud(
                self.name.clone(),
                self.kind,
                self.did.clone().unwrap_or_default(),
                self.model.clone(),
            )
        } else {
            let mut d = Device::http(self.name.clone(), self.kind, self.ip.clone().unwrap_or_default());
            d.model.clone_from(&self.model);
            d
        };
        device.visible = self.visible;
        match &self.id {
            Some(id) => device.with_id(DeviceId::from(id.as_str())),
            None => device,
        }
    }

    pub fn from_device(device: &Device) -> Self {
        Self {
            id: Some(device.id.to_string()),
            name: device.name.clone(),
            kind: device.kind,
            ip: device.address.clone(),
            did: device.external_id.clone(),
            model: device.model.clone(),
            visible: device.visible,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "aquaguard", "aquaguard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("aquaguard");
    p
}

/// Resolve `path` against the directory holding `config_file`.
pub fn resolve_relative(config_file: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_file
        .parent()
        .map_or_else(|| path.to_path_buf(), |dir| dir.join(path))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment.
///
/// `AQUAGUARD_SECTION_KEY` overrides `section.key`, e.g.
/// `AQUAGUARD_SETTINGS_REFRESH_INTERVAL_MS`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AQUAGUARD_").map(|key| key.as_str().replacen('_', ".", 1).into()));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default(path: &Path) -> Config {
    load_config(path).unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Reject device lists the engine could not service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.devices.iter().enumerate() {
            let field = || format!("devices[{index}]");
            if let Some(id) = &entry.id {
                if !seen.insert(id.as_str()) {
                    return Err(ConfigError::Validation {
                        field: field(),
                        reason: format!("duplicate id '{id}'"),
                    });
                }
            }
            let (key, value) = if entry.kind.is_cloud() {
                ("did", &entry.did)
            } else {
                ("ip", &entry.ip)
            };
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(ConfigError::Validation {
                    field: field(),
                    reason: format!("{} device '{}' needs `{key}`", entry.kind, entry.name),
                });
            }
        }
        Ok(())
    }

    /// Engine settings derived from this config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval_ms: clamp_interval(self.settings.refresh_interval_ms),
            max_workers: self.settings.max_workers,
            node_timeout: Duration::from_millis(self.settings.node_timeout_ms),
            change_logging: self.status_log.enabled,
            notification_rules: self.notification_rules(),
            ..EngineConfig::default()
        }
    }

    /// Devices with ids assigned. Entries without an id get a fresh one,
    /// so callers should persist the result with [`Config::set_devices`].
    pub fn devices(&self) -> Vec<Device> {
        self.devices.iter().map(DeviceEntry::to_device).collect()
    }

    /// Replace the device list with the registry's current contents.
    pub fn set_devices(&mut self, devices: &[Arc<Device>]) {
        self.devices = devices.iter().map(|d| DeviceEntry::from_device(d)).collect();
    }

    pub fn notification_rules(&self) -> NotificationRules {
        self.notification
            .rules
            .iter()
            .map(|(id, rule)| (DeviceId::from(id.as_str()), *rule))
            .collect()
    }

    pub fn set_notification_rules(&mut self, rules: &NotificationRules) {
        self.notification.rules = rules.iter().map(|(id, rule)| (id.to_string(), *rule)).collect();
    }

    /// Push settings with the token resolved from the credential chain.
    pub fn push_settings(&self) -> PushSettings {
        PushSettings {
            enabled: self.notification.enabled,
            token: resolve_push_token(&self.notification),
        }
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the push token: `token_env` (or `AQUAGUARD_PUSH_TOKEN`),
/// then the system keyring, then the plaintext value.
pub fn resolve_push_token(settings: &NotificationSettings) -> Option<SecretString> {
    // 1. Env var
    let env_name = settings.token_env.as_deref().unwrap_or(PUSH_TOKEN_ENV);
    if let Ok(val) = std::env::var(env_name) {
        if !val.is_empty() {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, "push-token") {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    settings
        .token
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.clone()))
}
