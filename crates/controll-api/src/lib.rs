// controll-api: Async HTTP clients for the Supervisor and the Controll platform
//
// `ApiClient` is the single transport primitive; `SupervisorClient` and
// `PlatformClient` wrap it with endpoint knowledge for the two remotes.

pub mod client;
pub mod error;
pub mod models;
pub mod platform;
pub mod supervisor;
pub mod transport;

pub use client::{ApiClient, Method};
pub use reqwest::header;
pub use error::Error;
pub use models::{HeartbeatPayload, SystemInfo};
pub use platform::PlatformClient;
pub use supervisor::SupervisorClient;
pub use transport::TransportConfig;
