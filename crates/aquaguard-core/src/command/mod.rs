// ── Command API ──
//
// Typed mutation requests routed by `Controller::execute`. Reads go
// straight to the registry or change log.

pub mod requests;

use std::sync::Arc;

use aquaguard_api::{LightMode, Scene};
use uuid::Uuid;

use crate::model::{Device, DeviceId, DeviceUpdate, NotificationRules};
use crate::orchestrator::PollOutcome;

pub use requests::AddDeviceRequest;

/// A mutation against the engine.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Registry ──
    AddDevice(AddDeviceRequest),
    RemoveDevice { id: DeviceId },
    UpdateDevice { id: DeviceId, update: DeviceUpdate },
    SyncCloudDevices,

    // ── Polling ──
    PollNow { id: DeviceId },
    SetPollInterval { ms: u64 },

    // ── Control ──
    SetPower { id: DeviceId, on: bool },
    SetColor { id: DeviceId, r: u8, g: u8, b: u8 },
    SetMode { id: DeviceId, mode: LightMode },
    ApplyScene { id: DeviceId, scene: Scene },

    // ── Notifications & change log ──
    SetNotificationRules { rules: NotificationRules },
    SetChangeLogging { enabled: bool },
    MarkLogRead { id: Uuid },
    MarkAllLogsRead,
    ClearLog,
}

/// Result of a [`Command`].
#[derive(Debug, Clone)]
pub enum CommandResult {
    Ok,
    Device(Arc<Device>),
    Polled(PollOutcome),
    /// Whether a control write (or log lookup) took effect.
    Accepted(bool),
    /// Effective poll interval in milliseconds.
    Interval(u64),
    Count(usize),
}
