// ── Runtime agent configuration ──
//
// Everything the agent needs to know, resolved once at process entry.
// `controll-config` builds an `AgentConfig` from options.json and the
// environment; core never reads config files itself.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::store::{DOCUMENT_FILE, THEMES_DIR};

/// Shared secrets, loaded once and never mutated.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Hub-to-platform shared secret. Authenticates inbound requests and
    /// seeds the heartbeat device id. `None` when the add-on is not yet
    /// provisioned.
    pub hub_token: Option<SecretString>,
    /// `SUPERVISOR_TOKEN` for outbound calls to the Supervisor API.
    pub supervisor_token: SecretString,
}

/// Immutable agent configuration, shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Home Assistant configuration directory (`/config` in the add-on).
    pub config_dir: PathBuf,
    /// Supervisor API base URL.
    pub supervisor_url: Url,
    /// Platform base URL receiving heartbeats.
    pub platform_url: Url,
    pub heartbeat_interval: Duration,
    /// Bound on every outbound HTTP call.
    pub request_timeout: Duration,
    /// Address the management API listens on.
    pub listen_addr: SocketAddr,
    /// Display name installed by startup reconciliation.
    pub brand_name: String,
    pub credentials: Credentials,
}

impl AgentConfig {
    /// Path of `configuration.yaml`.
    pub fn document_path(&self) -> PathBuf {
        self.config_dir.join(DOCUMENT_FILE)
    }

    /// Directory holding one YAML file per theme.
    pub fn themes_dir(&self) -> PathBuf {
        self.config_dir.join(THEMES_DIR)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}
