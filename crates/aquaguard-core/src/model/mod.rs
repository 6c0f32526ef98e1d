// ── Domain model ──

pub mod category;
pub mod change;
pub mod device;

pub use category::DeviceCategory;
pub use change::{ChangeLogEntry, NotificationRule, NotificationRules, PowerAction};
pub use device::{Device, DeviceId, DeviceKind, DeviceUpdate, TransportKind};
