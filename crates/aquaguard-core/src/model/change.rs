// ── Power transitions, change-log entries, notification rules ──

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::DeviceId;

/// Direction of a power transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerAction {
    On,
    Off,
}

impl From<bool> for PowerAction {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// One recorded power transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub device_id: DeviceId,
    pub device_name: String,
    pub action: PowerAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl ChangeLogEntry {
    pub fn new(device_id: DeviceId, device_name: impl Into<String>, action: PowerAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            device_name: device_name.into(),
            action,
            timestamp: Utc::now(),
            read: false,
        }
    }
}

/// Per-device push opt-in. A device without a rule is never pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    #[serde(rename = "on", default)]
    pub notify_on: bool,
    #[serde(rename = "off", default)]
    pub notify_off: bool,
}

impl NotificationRule {
    pub fn allows(self, action: PowerAction) -> bool {
        match action {
            PowerAction::On => self.notify_on,
            PowerAction::Off => self.notify_off,
        }
    }
}

pub type NotificationRules = HashMap<DeviceId, NotificationRule>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rule_uses_short_keys() {
        let rule: NotificationRule = serde_json::from_value(json!({"on": true})).unwrap();
        assert!(rule.allows(PowerAction::On));
        assert!(!rule.allows(PowerAction::Off));
    }

    #[test]
    fn entry_starts_unread() {
        let entry = ChangeLogEntry::new("d1".into(), "Lamp", PowerAction::Off);
        assert!(!entry.read);
        assert_eq!(serde_json::to_value(&entry).unwrap()["action"], "off");
    }
}
