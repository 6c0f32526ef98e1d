// Sensor node endpoints (ESP32 water-quality node).

use tracing::debug;

use crate::error::Error;
use crate::node::client::NodeClient;
use crate::node::models::{RawSensorStatus, SensorReading};
use crate::transport::TransportConfig;

/// Client for a sensor node. Read-only.
#[derive(Debug, Clone)]
pub struct SensorClient {
    node: NodeClient,
}

impl SensorClient {
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

    /// Read the current sensor values.
    ///
    /// `GET /status`
    pub async fn get_status(&self) -> Result<SensorReading, Error> {
        let raw: RawSensorStatus = self.node.get_json("status", &[]).await?;
        let reading = SensorReading::from(raw);
        debug!(
            temperature = reading.temperature,
            tds = reading.tds_value,
            "sensor status"
        );
        Ok(reading)
    }
}
