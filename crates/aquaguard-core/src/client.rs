// ── Device client dispatch ──
//
// Every device is serviced by exactly one of three client shapes,
// chosen from its transport kind. The cloud platform sits behind the
// `CloudPlatform` trait so the engine can run against a fake in tests.

use std::sync::Arc;

use aquaguard_api::node::{NodeClient, node_base_url};
use aquaguard_api::{CloudClient, CloudDevice, LightClient, LightMode, Scene, SensorClient};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::PollError;
use crate::model::{Device, DeviceCategory, TransportKind};
use crate::resolver::{VirtualAddress, WireCoordinate, coerce_bool};

// ── Cloud platform seam ─────────────────────────────────────────────

/// Narrow view of the cloud platform used by the engine.
#[async_trait]
pub trait CloudPlatform: Send + Sync {
    /// Whether a usable session is present. Must not touch the network.
    fn is_logged_in(&self) -> bool;

    /// One round trip returning every device with its reachability.
    async fn list_devices(&self) -> Result<Vec<CloudDevice>, PollError>;

    async fn read_property(&self, external_id: &str, at: WireCoordinate) -> Result<Value, PollError>;

    /// Returns whether the platform accepted the write.
    async fn write_property(&self, external_id: &str, at: WireCoordinate, value: Value) -> Result<bool, PollError>;
}

#[async_trait]
impl CloudPlatform for CloudClient {
    fn is_logged_in(&self) -> bool {
        // A client only exists for a restored session.
        true
    }

    async fn list_devices(&self) -> Result<Vec<CloudDevice>, PollError> {
        Ok(CloudClient::list_devices(self).await?)
    }

    async fn read_property(&self, external_id: &str, at: WireCoordinate) -> Result<Value, PollError> {
        Ok(CloudClient::read_property(self, external_id, at.into()).await?)
    }

    async fn write_property(&self, external_id: &str, at: WireCoordinate, value: Value) -> Result<bool, PollError> {
        let outcome = CloudClient::write_property(self, external_id, at.into(), &value).await?;
        if !outcome.is_success() {
            debug!(external_id, code = outcome.code, message = %outcome.message, "cloud write rejected");
        }
        Ok(outcome.is_success())
    }
}

// ── Property profiles ───────────────────────────────────────────────

const fn at(siid: u32, piid: u32) -> WireCoordinate {
    WireCoordinate {
        service_instance: siid,
        property_instance: piid,
    }
}

/// On/off switch of a physical cloud device.
pub const POWER_PROPERTY: WireCoordinate = at(2, 1);

const LIGHT_PROFILE: &[(&str, WireCoordinate)] = &[("brightness", at(2, 2)), ("color_temperature", at(2, 3))];

const FAN_PROFILE: &[(&str, WireCoordinate)] = &[("fan_level", at(2, 2))];

const PURIFIER_PROFILE: &[(&str, WireCoordinate)] = &[
    ("mode", at(2, 4)),
    ("temperature", at(3, 7)),
    ("humidity", at(3, 1)),
    ("pm25", at(3, 4)),
    ("air_quality", at(3, 8)),
    ("filter_life", at(4, 1)),
];

/// Extra properties read for a category, beyond power.
pub fn property_profile(category: DeviceCategory) -> &'static [(&'static str, WireCoordinate)] {
    match category {
        DeviceCategory::Light => LIGHT_PROFILE,
        DeviceCategory::Fan => FAN_PROFILE,
        DeviceCategory::Purifier => PURIFIER_PROFILE,
        DeviceCategory::Switch | DeviceCategory::Sensor | DeviceCategory::Other => &[],
    }
}

fn power_fields(data: &mut Map<String, Value>, on: bool) {
    data.insert("is_on".into(), Value::Bool(on));
    data.insert("power".into(), json!(if on { "on" } else { "off" }));
}

// ── Cloud device client ─────────────────────────────────────────────

/// Client for one cloud device, virtual or physical.
#[derive(Clone)]
pub struct CloudDeviceClient {
    platform: Arc<dyn CloudPlatform>,
    external_id: String,
    category: DeviceCategory,
}

impl CloudDeviceClient {
    pub fn new(platform: Arc<dyn CloudPlatform>, external_id: impl Into<String>, category: DeviceCategory) -> Self {
        Self {
            platform,
            external_id: external_id.into(),
            category,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    fn virtual_address(&self) -> Option<VirtualAddress> {
        VirtualAddress::parse(&self.external_id)
    }

    pub async fn read_status(&self) -> Result<Map<String, Value>, PollError> {
        if !self.platform.is_logged_in() {
            return Err(PollError::NotAuthenticated);
        }
        match self.virtual_address() {
            Some(addr) => self.read_virtual(&addr).await,
            None => self.read_physical().await,
        }
    }

    async fn read_virtual(&self, addr: &VirtualAddress) -> Result<Map<String, Value>, PollError> {
        let coord = addr.resolve_property("on")?;
        let value = self.platform.read_property(&addr.physical_id, coord).await?;
        let on = value
            .as_bool()
            .ok_or_else(|| PollError::Other(format!("non-boolean switch value: {value}")))?;

        let mut data = Map::new();
        data.insert("online".into(), Value::Bool(true));
        power_fields(&mut data, on);
        Ok(data)
    }

    async fn read_physical(&self) -> Result<Map<String, Value>, PollError> {
        let mut data = Map::new();
        data.insert("online".into(), Value::Bool(true));

        match self.platform.read_property(&self.external_id, POWER_PROPERTY).await {
            Ok(Value::Bool(on)) => power_fields(&mut data, on),
            Ok(_) => {}
            // Unreachable or unauthenticated is a failed poll; a device
            // that merely lacks the property is still online.
            Err(e) if e.is_transient() || e == PollError::NotAuthenticated => return Err(e),
            Err(e) => debug!(external_id = %self.external_id, error = %e, "no power property"),
        }

        let profile = property_profile(self.category);
        let reads = profile
            .iter()
            .map(|(_, coord)| self.platform.read_property(&self.external_id, *coord));
        for ((key, _), result) in profile.iter().zip(join_all(reads).await) {
            match result {
                Ok(Value::Null) | Err(_) => {}
                Ok(value) => {
                    data.insert((*key).to_owned(), value);
                }
            }
        }
        Ok(data)
    }

    /// Write a logical property. Virtual devices only accept the switch
    /// properties; physical devices accept `on`.
    pub async fn write(&self, logical_name: &str, value: &Value) -> Result<bool, PollError> {
        if !self.platform.is_logged_in() {
            return Err(PollError::NotAuthenticated);
        }
        let (target, coord) = match self.virtual_address() {
            Some(addr) => {
                let coord = addr.resolve_property(logical_name)?;
                (addr.physical_id, coord)
            }
            None if logical_name == "on" => (self.external_id.clone(), POWER_PROPERTY),
            None => {
                return Err(PollError::Unsupported(format!(
                    "property '{logical_name}' on {}",
                    self.external_id
                )));
            }
        };
        self.platform
            .write_property(&target, coord, Value::Bool(coerce_bool(value)))
            .await
    }
}

// ── Dispatch ────────────────────────────────────────────────────────

/// Client for one device, selected by transport kind.
#[derive(Clone)]
pub enum DeviceClient {
    HttpSensor(SensorClient),
    HttpLight(LightClient),
    Cloud(CloudDeviceClient),
}

impl DeviceClient {
    /// Build the client for `device`.
    ///
    /// HTTP clients share `http`; cloud clients need a platform handle.
    pub fn for_device(
        device: &Device,
        http: &reqwest::Client,
        cloud: Option<&Arc<dyn CloudPlatform>>,
    ) -> Result<Self, PollError> {
        match device.transport_kind() {
            TransportKind::HttpSensor | TransportKind::HttpLight => {
                let address = device
                    .address
                    .as_deref()
                    .filter(|a| !a.trim().is_empty())
                    .ok_or_else(|| PollError::Other(format!("device {} has no address", device.id)))?;
                let node = NodeClient::with_client(http.clone(), node_base_url(address)?);
                Ok(if device.transport_kind() == TransportKind::HttpSensor {
                    Self::HttpSensor(SensorClient::from_node(node))
                } else {
                    Self::HttpLight(LightClient::from_node(node))
                })
            }
            TransportKind::Cloud => {
                let platform = cloud.ok_or(PollError::NotAuthenticated)?;
                let external_id = device
                    .external_id
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| PollError::Other(format!("device {} has no cloud id", device.id)))?;
                Ok(Self::Cloud(CloudDeviceClient::new(
                    Arc::clone(platform),
                    external_id,
                    device.category(),
                )))
            }
        }
    }

    /// Read the device's current status as a `data` map.
    pub async fn read_status(&self) -> Result<Map<String, Value>, PollError> {
        match self {
            Self::HttpSensor(client) => {
                let r = client.get_status().await?;
                let mut data = Map::new();
                data.insert("temperature".into(), json!(r.temperature));
                data.insert("tds_value".into(), json!(r.tds_value));
                data.insert("water_level".into(), json!(r.water_level));
                data.insert("wifi_signal".into(), json!(r.wifi_signal));
                Ok(data)
            }
            Self::HttpLight(client) => {
                let s = client.get_status().await?;
                let mut data = Map::new();
                data.insert("power".into(), json!(s.power));
                data.insert("mode".into(), json!(s.mode));
                data.insert("color_r".into(), json!(s.color_r));
                data.insert("color_g".into(), json!(s.color_g));
                data.insert("color_b".into(), json!(s.color_b));
                data.insert("wifi_signal".into(), json!(s.wifi_signal));
                Ok(data)
            }
            Self::Cloud(client) => client.read_status().await,
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<bool, PollError> {
        match self {
            Self::HttpLight(client) => Ok(client.set_power(on).await?),
            Self::Cloud(client) => client.write("on", &Value::Bool(on)).await,
            Self::HttpSensor(_) => Err(PollError::Unsupported("sensors have no power switch".into())),
        }
    }

    pub async fn set_color(&self, r: u8, g: u8, b: u8) -> Result<bool, PollError> {
        Ok(self.light()?.set_color(r, g, b).await?)
    }

    pub async fn set_mode(&self, mode: LightMode) -> Result<bool, PollError> {
        Ok(self.light()?.set_mode(mode).await?)
    }

    pub async fn apply_scene(&self, scene: Scene) -> Result<bool, PollError> {
        Ok(self.light()?.apply_scene(scene).await?)
    }

    fn light(&self) -> Result<&LightClient, PollError> {
        match self {
            Self::HttpLight(client) => Ok(client),
            _ => Err(PollError::Unsupported("only HTTP lights support colour and mode".into())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::model::DeviceKind;

    #[derive(Default)]
    struct FakeCloud {
        props: HashMap<(String, u32, u32), Value>,
        writes: Mutex<Vec<(String, WireCoordinate, Value)>>,
    }

    #[async_trait]
    impl CloudPlatform for FakeCloud {
        fn is_logged_in(&self) -> bool {
            true
        }

        async fn list_devices(&self) -> Result<Vec<CloudDevice>, PollError> {
            Ok(Vec::new())
        }

        async fn read_property(&self, id: &str, at: WireCoordinate) -> Result<Value, PollError> {
            self.props
                .get(&(id.to_owned(), at.service_instance, at.property_instance))
                .cloned()
                .ok_or_else(|| PollError::Other("no such property".into()))
        }

        async fn write_property(&self, id: &str, at: WireCoordinate, value: Value) -> Result<bool, PollError> {
            self.writes.lock().unwrap().push((id.to_owned(), at, value));
            Ok(true)
        }
    }

    fn cloud(props: &[((&str, u32, u32), Value)]) -> Arc<FakeCloud> {
        Arc::new(FakeCloud {
            props: props
                .iter()
                .map(|((id, s, p), v)| (((*id).to_owned(), *s, *p), v.clone()))
                .collect(),
            ..FakeCloud::default()
        })
    }

    #[tokio::test]
    async fn virtual_read_uses_instance_service() {
        let fake = cloud(&[(("555", 3, 1), json!(true))]);
        let client = CloudDeviceClient::new(fake, "555.s3", DeviceCategory::Switch);
        let data = client.read_status().await.unwrap();
        assert_eq!(data["is_on"], json!(true));
        assert_eq!(data["power"], json!("on"));
        assert_eq!(data["online"], json!(true));
    }

    #[tokio::test]
    async fn physical_read_collects_profile() {
        let fake = cloud(&[
            (("9", 2, 1), json!(false)),
            (("9", 3, 4), json!(12)),
            (("9", 3, 7), json!(21.5)),
        ]);
        let client = CloudDeviceClient::new(fake, "9", DeviceCategory::Purifier);
        let data = client.read_status().await.unwrap();
        assert_eq!(data["power"], json!("off"));
        assert_eq!(data["pm25"], json!(12));
        assert_eq!(data["temperature"], json!(21.5));
        assert!(!data.contains_key("humidity"));
    }

    #[tokio::test]
    async fn physical_without_power_is_still_online() {
        let client = CloudDeviceClient::new(cloud(&[]), "9", DeviceCategory::Other);
        let data = client.read_status().await.unwrap();
        assert_eq!(data["online"], json!(true));
        assert!(!data.contains_key("power"));
    }

    #[tokio::test]
    async fn virtual_write_coerces_and_resolves() {
        let fake = cloud(&[]);
        let client = CloudDeviceClient::new(Arc::clone(&fake) as Arc<dyn CloudPlatform>, "555.s2", DeviceCategory::Switch);
        assert!(client.write("switch-on", &json!("ON")).await.unwrap());

        let writes = fake.writes.lock().unwrap();
        assert_eq!(writes[0].0, "555");
        assert_eq!(writes[0].1, at(2, 1));
        assert_eq!(writes[0].2, json!(true));
    }

    #[tokio::test]
    async fn virtual_write_rejects_unknown_property() {
        let client = CloudDeviceClient::new(cloud(&[]), "555.s2", DeviceCategory::Switch);
        assert!(matches!(
            client.write("brightness", &json!(50)).await,
            Err(PollError::Unsupported(_))
        ));
    }

    #[test]
    fn dispatch_follows_transport_kind() {
        let http = reqwest::Client::new();
        let sensor = Device::http("s", DeviceKind::Sensor, "10.0.0.1");
        assert!(matches!(
            DeviceClient::for_device(&sensor, &http, None).unwrap(),
            DeviceClient::HttpSensor(_)
        ));

        let lamp = Device::cloud("l", DeviceKind::MijiaLight, "77", None);
        assert!(matches!(
            DeviceClient::for_device(&lamp, &http, None),
            Err(PollError::NotAuthenticated)
        ));
        let platform: Arc<dyn CloudPlatform> = cloud(&[]);
        assert!(matches!(
            DeviceClient::for_device(&lamp, &http, Some(&platform)).unwrap(),
            DeviceClient::Cloud(_)
        ));
    }

    #[tokio::test]
    async fn sensors_reject_power() {
        let http = reqwest::Client::new();
        let sensor = Device::http("s", DeviceKind::Sensor, "10.0.0.1");
        let client = DeviceClient::for_device(&sensor, &http, None).unwrap();
        assert!(matches!(client.set_power(true).await, Err(PollError::Unsupported(_))));
    }
}
