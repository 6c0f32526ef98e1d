// ── Device category inference ──
//
// Cloud devices arrive with only a vendor model string and a user
// label. Keyword matching on both picks the property profile to read.

use serde::{Deserialize, Serialize};

use super::device::DeviceKind;

/// Functional class of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceCategory {
    Light,
    Switch,
    Fan,
    Sensor,
    Purifier,
    Other,
}

// Checked in order; the first class with a hit wins.
const RULES: &[(DeviceCategory, &[&str], &[&str])] = &[
    (
        DeviceCategory::Light,
        &["light", "lamp", "bulb", "yeelink"],
        &["灯", "台灯", "吸顶灯", "床头灯"],
    ),
    (
        DeviceCategory::Switch,
        &["switch", "plug", "outlet", "socket"],
        &["插座", "开关", "排插"],
    ),
    (
        DeviceCategory::Sensor,
        &["sensor", "temp", "humid"],
        &["传感器", "温度", "湿度"],
    ),
    (
        DeviceCategory::Fan,
        &["fan", "aircon", "hvac"],
        &["风扇", "空调", "电风扇"],
    ),
    (
        DeviceCategory::Purifier,
        &["purifier", "airpurifier", "airp"],
        &["净化器", "空气净化", "purifier"],
    ),
];

impl DeviceCategory {
    /// Infer a category from the vendor model and the device name.
    pub fn infer(model: &str, name: &str) -> Self {
        let model = model.to_lowercase();
        let name = name.to_lowercase();
        RULES
            .iter()
            .find(|(_, model_kw, name_kw)| {
                model_kw.iter().any(|kw| model.contains(kw)) || name_kw.iter().any(|kw| name.contains(kw))
            })
            .map_or(Self::Other, |(category, _, _)| *category)
    }

    /// Persisted kind for a newly discovered cloud device.
    pub fn cloud_kind(self) -> DeviceKind {
        match self {
            Self::Light => DeviceKind::MijiaLight,
            Self::Switch => DeviceKind::MijiaSwitch,
            Self::Fan => DeviceKind::MijiaFan,
            Self::Sensor => DeviceKind::MijiaSensor,
            Self::Purifier | Self::Other => DeviceKind::Mijia,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_keywords() {
        assert_eq!(DeviceCategory::infer("yeelink.light.ceiling1", ""), DeviceCategory::Light);
        assert_eq!(DeviceCategory::infer("chuangmi.plug.m1", ""), DeviceCategory::Switch);
        assert_eq!(DeviceCategory::infer("zhimi.airp.mb4", ""), DeviceCategory::Purifier);
        assert_eq!(DeviceCategory::infer("dmaker.fan.p5", ""), DeviceCategory::Fan);
    }

    #[test]
    fn name_keywords() {
        assert_eq!(DeviceCategory::infer("", "卧室台灯"), DeviceCategory::Light);
        assert_eq!(DeviceCategory::infer("", "客厅温度计"), DeviceCategory::Sensor);
    }

    #[test]
    fn light_wins_over_later_classes() {
        // "lamp" matches before any switch keyword is consulted
        assert_eq!(DeviceCategory::infer("lamp.switch", ""), DeviceCategory::Light);
    }

    #[test]
    fn nothing_matches() {
        assert_eq!(DeviceCategory::infer("xiaomi.gateway.v3", "Hub"), DeviceCategory::Other);
        assert_eq!(DeviceCategory::Other.cloud_kind(), DeviceKind::Mijia);
    }
}
