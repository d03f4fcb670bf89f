//! Add-on configuration for controll-supervisor.
//!
//! The Supervisor renders the user's add-on options to `/data/options.json`.
//! That file is layered over built-in defaults and `CONTROLL_*` environment
//! overrides, validated, and translated into `controll_core::AgentConfig`.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use controll_core::{AgentConfig, Credentials, DEFAULT_BRAND_NAME};

/// Where the Supervisor mounts the add-on options.
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";
/// Prefix of environment overrides (`CONTROLL_PLATFORM_URL`, ...).
pub const ENV_PREFIX: &str = "CONTROLL_";
/// Environment variable the Supervisor injects with the add-on's API token.
pub const SUPERVISOR_TOKEN_ENV: &str = "SUPERVISOR_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("options file not found: {}", path.display())]
    MissingOptions { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Options ─────────────────────────────────────────────────────────

/// Add-on options as rendered by the Supervisor, plus local overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Options {
    /// Hub-to-platform shared secret. Empty means not provisioned.
    #[serde(default)]
    pub hub_token: String,

    #[serde(default = "default_platform_url")]
    pub platform_url: String,

    /// Seconds between heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,

    /// `trace`, `debug`, `info`, `warning` or `error`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default = "default_supervisor_url")]
    pub supervisor_url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds before an outbound call is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_brand_name")]
    pub brand_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hub_token: String::new(),
            platform_url: default_platform_url(),
            heartbeat_interval: default_heartbeat_interval(),
            log_level: default_log_level(),
            config_dir: default_config_dir(),
            supervisor_url: default_supervisor_url(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            brand_name: default_brand_name(),
        }
    }
}

fn default_platform_url() -> String {
    "https://api.controll.it".into()
}
fn default_heartbeat_interval() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}
fn default_config_dir() -> PathBuf {
    PathBuf::from("/config")
}
fn default_supervisor_url() -> String {
    "http://supervisor".into()
}
fn default_port() -> u16 {
    8099
}
fn default_request_timeout() -> u64 {
    30
}
fn default_brand_name() -> String {
    DEFAULT_BRAND_NAME.into()
}

impl Options {
    /// Check every field that has a constrained domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval == 0 {
            return Err(invalid("heartbeat_interval", "must be greater than 0"));
        }
        if self.request_timeout == 0 {
            return Err(invalid("request_timeout", "must be greater than 0"));
        }
        if self.brand_name.trim().is_empty() {
            return Err(invalid("brand_name", "must not be empty"));
        }
        self.log_filter()?;
        parse_url("platform_url", &self.platform_url)?;
        parse_url("supervisor_url", &self.supervisor_url)?;
        Ok(())
    }

    /// `log_level` as a `tracing` filter directive.
    pub fn log_filter(&self) -> Result<&'static str, ConfigError> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok("trace"),
            "debug" => Ok("debug"),
            "info" => Ok("info"),
            "warning" | "warn" => Ok("warn"),
            "error" | "critical" | "fatal" => Ok("error"),
            other => Err(invalid(
                "log_level",
                format!("expected trace, debug, info, warning or error, got '{other}'"),
            )),
        }
    }

    /// Validate and build the immutable runtime configuration.
    pub fn to_agent_config(&self, supervisor_token: SecretString) -> Result<AgentConfig, ConfigError> {
        self.validate()?;

        let hub_token = Some(self.hub_token.trim())
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.to_owned()));

        Ok(AgentConfig {
            config_dir: self.config_dir.clone(),
            supervisor_url: parse_url("supervisor_url", &self.supervisor_url)?,
            platform_url: parse_url("platform_url", &self.platform_url)?,
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval),
            request_timeout: Duration::from_secs(self.request_timeout),
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)),
            brand_name: self.brand_name.trim().to_owned(),
            credentials: Credentials {
                hub_token,
                supervisor_token,
            },
        })
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(field, format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, format!("expected an http(s) URL, got '{raw}'")));
    }
    Ok(url)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load options from `path`, layered over defaults and under `CONTROLL_*`
/// environment overrides.
///
/// The file is required: the add-on cannot run without the options the
/// Supervisor renders.
pub fn load_options(path: &Path) -> Result<Options, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingOptions {
            path: path.to_path_buf(),
        });
    }

    let figment = Figment::new()
        .merge(Serialized::defaults(Options::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["options"]));

    let options: Options = figment.extract()?;
    options.validate()?;
    Ok(options)
}

/// The Supervisor API token from the environment. Empty when unset,
/// in which case Supervisor calls will be rejected.
pub fn supervisor_token_from_env() -> SecretString {
    SecretString::from(std::env::var(SUPERVISOR_TOKEN_ENV).unwrap_or_default())
}
