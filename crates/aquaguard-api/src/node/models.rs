// Wire types for the ESP node HTTP API.
//
// Every field is defaulted: node firmware omits keys freely, and a
// partial status is still a successful poll.

use serde::{Deserialize, Serialize};

/// `GET /status` on a sensor node.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSensorStatus {
    #[serde(default)]
    pub system: RawSystem,
    #[serde(default)]
    pub sensors: RawSensors,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSystem {
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub wifi_signal: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSensors {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub tds_value: i64,
    #[serde(default = "default_water_level")]
    pub water_level: i64,
    #[serde(default)]
    pub alert_flag: bool,
}

impl Default for RawSensors {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            tds_value: 0,
            water_level: default_water_level(),
            alert_flag: false,
        }
    }
}

fn default_water_level() -> i64 {
    1
}

/// `GET /status` on a light node.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLightStatus {
    #[serde(default = "default_power")]
    pub power: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub color: RawColor,
    #[serde(default)]
    pub wifi_signal: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawColor {
    #[serde(default = "full")]
    pub r: u8,
    #[serde(default = "full")]
    pub g: u8,
    #[serde(default = "full")]
    pub b: u8,
}

impl Default for RawColor {
    fn default() -> Self {
        Self {
            r: full(),
            g: full(),
            b: full(),
        }
    }
}

fn default_power() -> String {
    "off".into()
}

fn default_mode() -> String {
    "static".into()
}

fn full() -> u8 {
    255
}

/// `{success: bool}` acknowledgement returned by light control endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Ack {
    #[serde(default)]
    pub success: bool,
}

// ── Public decoded types ────────────────────────────────────────────

/// Decoded sensor node reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub tds_value: i64,
    pub water_level: i64,
    pub alert_flag: bool,
    pub uptime: u64,
    pub wifi_signal: i64,
}

impl From<RawSensorStatus> for SensorReading {
    fn from(raw: RawSensorStatus) -> Self {
        Self {
            temperature: raw.sensors.temperature,
            tds_value: raw.sensors.tds_value,
            water_level: raw.sensors.water_level,
            alert_flag: raw.sensors.alert_flag,
            uptime: raw.system.uptime,
            wifi_signal: raw.system.wifi_signal,
        }
    }
}

/// Decoded light node status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightStatus {
    /// `"on"` or `"off"`.
    pub power: String,
    pub mode: String,
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
    pub wifi_signal: i64,
}

impl LightStatus {
    pub fn is_on(&self) -> bool {
        self.power == "on"
    }
}

impl From<RawLightStatus> for LightStatus {
    fn from(raw: RawLightStatus) -> Self {
        Self {
            power: raw.power,
            mode: raw.mode,
            color_r: raw.color.r,
            color_g: raw.color.g,
            color_b: raw.color.b,
            wifi_signal: raw.wifi_signal,
        }
    }
}
