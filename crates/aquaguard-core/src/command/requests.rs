// ── Typed request structs for Command payloads ──

use serde::{Deserialize, Serialize};

use crate::model::{Device, DeviceId, DeviceKind};

// ── Device ─────────────────────────────────────────────────────────

/// Everything needed to register a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDeviceRequest {
    /// Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DeviceId>,
    pub name: String,
    pub kind: DeviceKind,
    /// Required for HTTP nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Required for cloud devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl AddDeviceRequest {
    pub fn into_device(self) -> Device {
        let mut device = if self.kind.is_cloud() {
            Device::cloud(self.name, self.kind, self.external_id.unwrap_or_default(), self.model)
        } else {
            let mut d = Device::http(self.name, self.kind, self.address.unwrap_or_default());
            d.model = self.model;
            d
        };
        device.visible = self.visible;
        match self.id {
            Some(id) => device.with_id(id),
            None => device,
        }
    }
}
