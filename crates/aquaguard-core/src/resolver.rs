// ── Virtual address resolution ──
//
// A multi-gang switch shows up on the cloud platform as one physical
// device. Each gang is exposed as its own logical device whose id is
// `<physical>.s<instance>`; the instance is the service id of that gang
// and the on/off property is always property 1 of that service.

use serde_json::Value;

use crate::error::PollError;

/// Logical properties that map onto a virtual device's switch.
pub const SWITCH_PROPERTIES: [&str; 3] = ["on", "power", "switch-on"];

/// Parsed `<physical>.s<instance>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualAddress {
    pub physical_id: String,
    pub instance: u32,
}

/// Wire-level `(service, property)` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireCoordinate {
    pub service_instance: u32,
    pub property_instance: u32,
}

impl From<WireCoordinate> for aquaguard_api::PropertyAddress {
    fn from(c: WireCoordinate) -> Self {
        Self::new(c.service_instance, c.property_instance)
    }
}

impl VirtualAddress {
    /// Parse a composite id. `None` means the id is not virtual.
    pub fn parse(id: &str) -> Option<Self> {
        let (physical, suffix) = id.rsplit_once('.')?;
        let digits = suffix.strip_prefix('s')?;
        if physical.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            physical_id: physical.to_owned(),
            instance: digits.parse().ok()?,
        })
    }

    /// Map a logical property name to its wire coordinate.
    pub fn resolve_property(&self, logical_name: &str) -> Result<WireCoordinate, PollError> {
        if SWITCH_PROPERTIES.contains(&logical_name) {
            Ok(WireCoordinate {
                service_instance: self.instance,
                property_instance: 1,
            })
        } else {
            Err(PollError::Unsupported(format!(
                "property '{logical_name}' on virtual device {}.s{}",
                self.physical_id, self.instance
            )))
        }
    }
}

/// Coerce a value to the boolean the platform expects on write.
///
/// Booleans pass through, numbers are true when non-zero, strings are
/// true for `true`/`1`/`on` (any case). Anything else uses truthiness:
/// null is false, containers are true when non-empty.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "on"),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
