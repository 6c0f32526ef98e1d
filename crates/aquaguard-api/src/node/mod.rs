// ESP node HTTP API: sensor and light nodes.

pub mod client;
pub mod light;
pub mod models;
pub mod sensor;

pub use client::{NodeClient, node_base_url};
pub use light::{LightClient, LightMode, Scene, clamp_channel};
pub use models::{LightStatus, SensorReading};
pub use sensor::SensorClient;
