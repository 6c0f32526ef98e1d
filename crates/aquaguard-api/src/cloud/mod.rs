// Cloud smart-home platform API.

pub mod client;
pub mod models;
pub mod session;

pub use client::{CloudClient, DEFAULT_CLOUD_BASE_URL};
pub use models::{CloudDevice, PropertyAddress, WriteOutcome};
pub use session::{CloudSession, REQUIRED_AUTH_KEYS};
