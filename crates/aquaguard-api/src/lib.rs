// aquaguard-api: Async clients for AquaGuard HTTP nodes, the cloud smart-home
// platform, and the push notification service

pub mod cloud;
pub mod error;
pub mod node;
pub mod push;
pub mod transport;

pub use cloud::{CloudClient, CloudDevice, CloudSession, PropertyAddress, WriteOutcome};
pub use error::Error;
pub use node::{LightClient, LightMode, LightStatus, NodeClient, Scene, SensorClient, SensorReading};
pub use push::PushClient;
pub use transport::TransportConfig;
