//! Shared helpers for command handlers.

use std::sync::Arc;

use aquaguard_core::{Controller, Device};

use crate::error::CliError;

/// Resolve a device by exact id, then by case-insensitive name.
pub fn resolve_device(controller: &Controller, identifier: &str) -> Result<Arc<Device>, CliError> {
    let devices = controller.devices();
    if let Some(device) = devices.iter().find(|d| d.id.as_str() == identifier) {
        return Ok(Arc::clone(device));
    }

    let mut by_name = devices.iter().filter(|d| d.name.eq_ignore_ascii_case(identifier));
    match (by_name.next(), by_name.next()) {
        (Some(device), None) => Ok(Arc::clone(device)),
        (Some(_), Some(_)) => Err(CliError::Ambiguous {
            identifier: identifier.into(),
        }),
        (None, _) => Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "devices list".into(),
        }),
    }
}

/// One-block detail view of a device.
pub fn device_detail(d: &Device) -> String {
    let mut lines = vec![
        format!("ID:        {}", d.id),
        format!("Name:      {}", d.name),
        format!("Type:      {}", d.kind),
        format!("Category:  {}", d.category()),
    ];
    if let Some(address) = &d.address {
        lines.push(format!("Address:   {address}"));
    }
    if let Some(did) = &d.external_id {
        lines.push(format!("Cloud id:  {did}"));
    }
    if let Some(model) = &d.model {
        lines.push(format!("Model:     {model}"));
    }
    lines.push(format!("Visible:   {}", d.visible));
    lines.push(format!("Status:    {}", d.status_text()));
    lines.push(format!(
        "Last seen: {}",
        d.last_seen
            .map_or_else(|| "never".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    ));
    if d.fail_count() > 0 {
        lines.push(format!("Failures:  {}", d.fail_count()));
    }
    for (key, value) in &d.data {
        lines.push(format!("  {key}: {value}"));
    }
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aquaguard_core::{ControllerParts, DeviceKind, EngineConfig};

    use super::*;

    fn controller(devices: Vec<Device>) -> Controller {
        Controller::new(
            EngineConfig::default(),
            ControllerParts {
                devices,
                ..ControllerParts::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn resolves_by_id_then_name() {
        let lamp = Device::http("Reef Light", DeviceKind::Light, "10.0.0.2");
        let id = lamp.id.clone();
        let c = controller(vec![lamp]);

        assert_eq!(resolve_device(&c, id.as_str()).unwrap().id, id);
        assert_eq!(resolve_device(&c, "reef light").unwrap().id, id);
        assert!(matches!(resolve_device(&c, "nope"), Err(CliError::NotFound { .. })));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let c = controller(vec![
            Device::http("Pump", DeviceKind::Switch, "10.0.0.3"),
            Device::http("pump", DeviceKind::Switch, "10.0.0.4"),
        ]);
        assert!(matches!(resolve_device(&c, "PUMP"), Err(CliError::Ambiguous { .. })));
    }
}
