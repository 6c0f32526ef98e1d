// ── Device domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::category::DeviceCategory;

// ── DeviceId ────────────────────────────────────────────────────────

/// Stable identifier assigned when a device is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Kinds ───────────────────────────────────────────────────────────

/// Persisted device type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeviceKind {
    Light,
    Sensor,
    Switch,
    Mijia,
    MijiaLight,
    MijiaSwitch,
    MijiaFan,
    MijiaSensor,
}

// Unknown kinds from older config files load as lights.
impl<'de> Deserialize<'de> for DeviceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Self::Light))
    }
}

impl DeviceKind {
    pub fn transport_kind(self) -> TransportKind {
        match self {
            Self::Sensor => TransportKind::HttpSensor,
            Self::Light | Self::Switch => TransportKind::HttpLight,
            Self::Mijia | Self::MijiaLight | Self::MijiaSwitch | Self::MijiaFan | Self::MijiaSensor => {
                TransportKind::Cloud
            }
        }
    }

    pub fn is_cloud(self) -> bool {
        self.transport_kind() == TransportKind::Cloud
    }

    /// Category implied by the kind alone.
    pub fn category(self) -> DeviceCategory {
        match self {
            Self::Light | Self::MijiaLight => DeviceCategory::Light,
            Self::Sensor | Self::MijiaSensor => DeviceCategory::Sensor,
            Self::Switch | Self::MijiaSwitch => DeviceCategory::Switch,
            Self::MijiaFan => DeviceCategory::Fan,
            Self::Mijia => DeviceCategory::Other,
        }
    }
}

/// Which client services a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    HttpSensor,
    HttpLight,
    Cloud,
}

// ── Device ──────────────────────────────────────────────────────────

fn default_name() -> String {
    "Unnamed device".into()
}

fn default_visible() -> bool {
    true
}

/// One managed device.
///
/// `online`, `last_seen`, and the failure counter are only ever changed
/// through [`FailureTracker`](crate::failure::FailureTracker) or the
/// bulk reachability pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Cloud platform identifier (`did`), possibly virtual (`<did>.sN`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// `host[:port]` for HTTP nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(skip)]
    pub(crate) fail_count: u32,
}

impl Device {
    /// A new HTTP node device.
    pub fn http(name: impl Into<String>, kind: DeviceKind, address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::bare(name.into(), kind)
        }
    }

    /// A new cloud-platform device.
    pub fn cloud(
        name: impl Into<String>,
        kind: DeviceKind,
        external_id: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            external_id: Some(external_id.into()),
            model,
            ..Self::bare(name.into(), kind)
        }
    }

    fn bare(name: String, kind: DeviceKind) -> Self {
        Self {
            id: DeviceId::generate(),
            name,
            kind,
            external_id: None,
            model: None,
            address: None,
            visible: true,
            online: false,
            last_seen: None,
            data: Map::new(),
            fail_count: 0,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: DeviceId) -> Self {
        self.id = id;
        self
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.kind.transport_kind()
    }

    pub fn is_cloud(&self) -> bool {
        self.kind.is_cloud()
    }

    /// Consecutive failed polls since the last success.
    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    /// Category used to pick the cloud property profile.
    pub fn category(&self) -> DeviceCategory {
        let inferred = DeviceCategory::infer(self.model.as_deref().unwrap_or(""), &self.name);
        if inferred == DeviceCategory::Other {
            self.kind.category()
        } else {
            inferred
        }
    }

    /// Boolean power state: `data.is_on` if present, else `data.power == "on"`.
    /// `None` until the device has reported either field.
    pub fn power_state(&self) -> Option<bool> {
        match self.data.get("is_on").and_then(Value::as_bool) {
            Some(on) => Some(on),
            None => self.data.get("power").and_then(Value::as_str).map(|p| p == "on"),
        }
    }

    /// Short human-readable status.
    pub fn status_text(&self) -> String {
        if !self.online {
            return "Offline".into();
        }
        let power = self.data.get("power").and_then(Value::as_str);
        let on_off = |p: Option<&str>| if p == Some("on") { "On" } else { "Off" };

        match self.kind {
            DeviceKind::Light | DeviceKind::Switch => on_off(power).into(),
            DeviceKind::Sensor | DeviceKind::MijiaSensor => self
                .data
                .get("temperature")
                .and_then(Value::as_f64)
                .map_or_else(|| "Online".into(), |t| format!("{t:.1}°C")),
            DeviceKind::MijiaLight | DeviceKind::MijiaSwitch | DeviceKind::MijiaFan => {
                if power != Some("on") {
                    return "Off".into();
                }
                match self.data.get("brightness").filter(|v| !v.is_null()) {
                    Some(b) => format!("On ({b}%)"),
                    None => "On".into(),
                }
            }
            DeviceKind::Mijia => {
                if ["pm25", "filter_life", "air_quality"]
                    .iter()
                    .any(|k| self.data.contains_key(*k))
                {
                    return self.purifier_summary();
                }
                power.map_or_else(|| "Online".into(), |p| on_off(Some(p)).into())
            }
        }
    }

    fn purifier_summary(&self) -> String {
        let field = |key: &str| {
            self.data
                .get(key)
                .filter(|v| !v.is_null())
                .map_or_else(|| "--".to_owned(), ToString::to_string)
        };
        format!(
            "{}℃ | {}% | PM2.5 {}",
            field("temperature"),
            field("humidity"),
            field("pm25")
        )
    }
}

// ── DeviceUpdate ────────────────────────────────────────────────────

/// Partial update applied by `update_device`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub model: Option<String>,
    pub visible: Option<bool>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.model.is_none() && self.visible.is_none()
    }

    pub(crate) fn apply(self, device: &mut Device) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(address) = self.address {
            device.address = Some(address);
        }
        if let Some(model) = self.model {
            device.model = Some(model);
        }
        if let Some(visible) = self.visible {
            device.visible = visible;
        }
    }
}
