//! Shared state handed to every request handler.

use std::sync::Arc;

use controll_api::SupervisorClient;
use controll_core::{AgentConfig, ConfigStore};
use secrecy::ExposeSecret;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub store: ConfigStore,
    pub supervisor: SupervisorClient,
}

impl AppState {
    pub fn new(config: Arc<AgentConfig>, supervisor: SupervisorClient) -> Self {
        let store = ConfigStore::new(config.config_dir());
        Self {
            config,
            store,
            supervisor,
        }
    }

    /// The token inbound requests must present. Empty when the add-on is
    /// not provisioned, which rejects every request.
    pub fn hub_token(&self) -> &str {
        self.config
            .credentials
            .hub_token
            .as_ref()
            .map_or("", |t| t.expose_secret())
    }
}
