// Light node endpoints (ESP8266 LED strip node).
//
// Power goes through the bare `/on` and `/off` routes that simple
// firmware exposes; colour and mode use query-parameter routes that
// answer with a `{success}` acknowledgement.

use std::fmt;
use std::str::FromStr;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::Error;
use crate::node::client::NodeClient;
use crate::node::models::{Ack, LightStatus, RawLightStatus};
use crate::transport::TransportConfig;

/// Animation mode supported by the light firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    Static,
    Rainbow,
    Breath,
}

impl LightMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rainbow => "rainbow",
            Self::Breath => "breath",
        }
    }
}

impl fmt::Display for LightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LightMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "rainbow" => Ok(Self::Rainbow),
            "breath" => Ok(Self::Breath),
            other => Err(Error::UnsupportedOperation(format!(
                "invalid light mode: {other}"
            ))),
        }
    }
}

/// Preset scenes built from colour + mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    /// Bright neutral white.
    Daylight,
    /// Dim deep blue.
    Moonlight,
    /// Rainbow cycle.
    Aurora,
}

impl FromStr for Scene {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daylight" => Ok(Self::Daylight),
            "moonlight" => Ok(Self::Moonlight),
            "aurora" => Ok(Self::Aurora),
            other => Err(Error::UnsupportedOperation(format!("unknown scene: {other}"))),
        }
    }
}

/// Client for a light node.
#[derive(Debug, Clone)]
pub struct LightClient {
    node: NodeClient,
}

impl LightClient {
    pub fn new(address: &str, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            node: NodeClient::new(address, transport)?,
        })
    }

    pub fn from_node(node: NodeClient) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &NodeClient {
        &self.node
    }

    /// `GET /status`
    pub async fn get_status(&self) -> Result<LightStatus, Error> {
        let raw: RawLightStatus = self.node.get_json("status", &[]).await?;
        Ok(LightStatus::from(raw))
    }

    /// Switch the light on or off.
    ///
    /// `GET /on` or `GET /off`. Success iff the node answers HTTP 200.
    pub async fn set_power(&self, on: bool) -> Result<bool, Error> {
        let path = if on { "on" } else { "off" };
        debug!(on, "setting light power");
        let resp = self.node.get_raw(path, &[]).await?;
        Ok(resp.status() == StatusCode::OK)
    }

    /// Set the static colour. Components are clamped by type to 0–255.
    ///
    /// `GET /color?r=..&g=..&b=..`
    pub async fn set_color(&self, r: u8, g: u8, b: u8) -> Result<bool, Error> {
        debug!(r, g, b, "setting light colour");
        let ack: Ack = self
            .node
            .get_json(
                "color",
                &[("r", r.to_string()), ("g", g.to_string()), ("b", b.to_string())],
            )
            .await?;
        Ok(ack.success)
    }

    /// `GET /mode?type=..`
    pub async fn set_mode(&self, mode: LightMode) -> Result<bool, Error> {
        debug!(%mode, "setting light mode");
        let ack: Ack = self
            .node
            .get_json("mode", &[("type", mode.as_str().to_owned())])
            .await?;
        Ok(ack.success)
    }

    /// Apply a preset scene. Stops at the first failed step.
    pub async fn apply_scene(&self, scene: Scene) -> Result<bool, Error> {
        match scene {
            Scene::Daylight => {
                Ok(self.set_color(255, 255, 255).await? && self.set_mode(LightMode::Static).await?)
            }
            Scene::Moonlight => {
                Ok(self.set_color(30, 50, 100).await? && self.set_mode(LightMode::Static).await?)
            }
            Scene::Aurora => self.set_mode(LightMode::Rainbow).await,
        }
    }
}

/// Clamp an arbitrary integer colour component into `0..=255`.
pub fn clamp_channel(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn light_mode_parses_case_insensitively() {
        assert_eq!("Rainbow".parse::<LightMode>().unwrap(), LightMode::Rainbow);
        assert!("disco".parse::<LightMode>().is_err());
    }

    #[test]
    fn clamp_channel_bounds() {
        assert_eq!(clamp_channel(-5), 0);
        assert_eq!(clamp_channel(300), 255);
        assert_eq!(clamp_channel(42), 42);
    }
}
