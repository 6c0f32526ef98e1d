//! Device-state synchronization engine for AquaGuard.
//!
//! Keeps an in-memory registry of heterogeneous devices (HTTP sensor and
//! light nodes, cloud smart-home devices) in sync with reality:
//!
//! - **[`PollOrchestrator`]** runs the poll cycle: one bulk reachability
//!   pass against the cloud, target selection, then a bounded fan-out of
//!   per-device detail polls through the [`WorkerPool`].
//! - **[`DeviceRegistry`]** is the shared device table. Every write is an
//!   atomic read-modify-write of one device.
//! - **[`FailureTracker`]** applies the online/offline hysteresis and
//!   **[`StatusCache`]** shields the cloud from redundant reads.
//! - **[`ChangeDetector`]** turns power-state flips into
//!   [`ChangeLog`] entries and rule-gated push notifications.
//! - **[`Controller`]** is the facade used by the CLI; mutations are
//!   expressed as [`Command`]s.
//!
//! This crate never reads configuration files; see `aquaguard-config`.

pub mod cache;
pub mod changelog;
pub mod client;
pub mod command;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod failure;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod pool;
pub mod registry;
pub mod resolver;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{STATUS_TTL, StatusCache};
pub use changelog::{CHANGE_LOG_CAPACITY, ChangeLog, ChangeLogSink};
pub use client::{CloudDeviceClient, CloudPlatform, DeviceClient};
pub use command::{AddDeviceRequest, Command, CommandResult};
pub use config::{DEFAULT_POLL_INTERVAL_MS, EngineConfig, MIN_POLL_INTERVAL_MS};
pub use controller::{Controller, ControllerParts};
pub use detector::{ChangeDetector, Transition};
pub use error::{CoreError, PollError};
pub use failure::{FailureTracker, LinkState, OFFLINE_THRESHOLD};
pub use notify::{NotificationSink, PushNotifier, PushSettings};
pub use orchestrator::{CycleReport, PollOrchestrator, PollOutcome, StatusCallback};
pub use pool::{MAX_WORKERS, WorkerPool};
pub use registry::DeviceRegistry;
pub use resolver::{VirtualAddress, WireCoordinate};

pub use model::{
    ChangeLogEntry, Device, DeviceCategory, DeviceId, DeviceKind, DeviceUpdate, NotificationRule, NotificationRules,
    PowerAction, TransportKind,
};
