// Controll platform ingestion API
//
// Only the heartbeat endpoint is used; the response body is ignored and
// the status code alone decides success.

use reqwest::header::HeaderMap;
use tracing::debug;
use url::Url;

use crate::client::{ApiClient, Method};
use crate::error::Error;
use crate::models::HeartbeatPayload;

/// Path of the heartbeat endpoint, relative to the platform base URL.
pub const HEARTBEAT_PATH: &str = "api/provision/heartbeat";

/// Client for the remote fleet-management platform.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    api: ApiClient,
    base_url: Url,
}

impl PlatformClient {
    pub fn new(api: ApiClient, base_url: Url) -> Self {
        Self { api, base_url }
    }

    /// The platform base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST {platform}/api/provision/heartbeat`
    pub async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), Error> {
        let body = serde_json::to_value(payload)?;
        debug!(device_id = %payload.device_id, "sending heartbeat");
        self.api
            .call(
                &self.base_url,
                HEARTBEAT_PATH,
                Method::POST,
                HeaderMap::new(),
                Some(&body),
            )
            .await?;
        Ok(())
    }
}
