// Home Assistant Supervisor API
//
// Host, Core and add-on management plus the Core REST API proxied under
// `/core/api`. Every call carries the add-on's `SUPERVISOR_TOKEN`.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::{ApiClient, Method};
use crate::error::Error;
use crate::models::{SystemInfo, unwrap_data};

/// Client for the local hub-management (Supervisor) API.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    api: ApiClient,
    base_url: Url,
    headers: HeaderMap,
}

impl SupervisorClient {
    /// Create a client for `base_url` (normally `http://supervisor`).
    pub fn new(api: ApiClient, base_url: Url, token: &SecretString) -> Result<Self, Error> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::InvalidHeader {
                header: "Authorization",
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            api,
            base_url,
            headers,
        })
    }

    /// The Supervisor base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        self.api
            .call(&self.base_url, path, Method::GET, self.headers.clone(), None)
            .await
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, Error> {
        self.api
            .call(&self.base_url, path, Method::POST, self.headers.clone(), body)
            .await
    }

    // ── Core ─────────────────────────────────────────────────────────

    /// `GET /core/info`, envelope stripped.
    pub async fn core_info(&self) -> Result<Value, Error> {
        debug!("fetching core info");
        self.get("core/info").await.map(unwrap_data)
    }

    /// Running Home Assistant Core version, if the Supervisor reports one.
    pub async fn ha_version(&self) -> Result<Option<String>, Error> {
        let info = self.core_info().await?;
        Ok(info
            .get("version")
            .and_then(Value::as_str)
            .map(String::from))
    }

    /// `POST /core/restart`
    pub async fn restart_core(&self) -> Result<(), Error> {
        debug!("restarting core");
        self.post("core/restart", None).await?;
        Ok(())
    }

    // ── Core REST API (proxied) ──────────────────────────────────────

    /// `GET /core/api/states` — every entity state as raw JSON.
    pub async fn states(&self) -> Result<Value, Error> {
        debug!("fetching entity states");
        self.get("core/api/states").await
    }

    /// Number of entities in `core/api/states`.
    pub async fn entity_count(&self) -> Result<u64, Error> {
        match self.states().await? {
            Value::Array(states) => Ok(u64::try_from(states.len()).unwrap_or(u64::MAX)),
            other => Err(Error::Deserialization {
                message: "expected an array of entity states".into(),
                body: other.to_string(),
            }),
        }
    }

    /// `GET /core/api/config`
    pub async fn ha_config(&self) -> Result<Value, Error> {
        debug!("fetching core config");
        self.get("core/api/config").await
    }

    /// `POST /core/api/services/{domain}/{service}` with `data` as body.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: &Value,
    ) -> Result<Value, Error> {
        debug!(domain, service, "calling service");
        self.post(&format!("core/api/services/{domain}/{service}"), Some(data))
            .await
    }

    // ── Add-ons ──────────────────────────────────────────────────────

    /// `GET /addons` — the `data.addons` list.
    pub async fn addons(&self) -> Result<Vec<Value>, Error> {
        debug!("listing add-ons");
        let data = self.get("addons").await.map(unwrap_data)?;
        match data.get("addons") {
            Some(Value::Array(addons)) => Ok(addons.clone()),
            _ => Ok(Vec::new()),
        }
    }

    /// `POST /addons/{slug}/install`
    pub async fn install_addon(&self, slug: &str) -> Result<(), Error> {
        debug!(slug, "installing add-on");
        self.post(&format!("addons/{slug}/install"), None).await?;
        Ok(())
    }

    // ── Host / system ────────────────────────────────────────────────

    /// `GET /host/info`, envelope stripped.
    pub async fn host_info(&self) -> Result<Value, Error> {
        self.get("host/info").await.map(unwrap_data)
    }

    /// `GET /supervisor/info`, envelope stripped.
    pub async fn supervisor_info(&self) -> Result<Value, Error> {
        self.get("supervisor/info").await.map(unwrap_data)
    }

    /// Host, Core and Supervisor info fetched in parallel.
    pub async fn system_info(&self) -> Result<SystemInfo, Error> {
        debug!("fetching system info");
        let (host, core, supervisor) =
            tokio::join!(self.host_info(), self.core_info(), self.supervisor_info());
        Ok(SystemInfo {
            host: host?,
            core: core?,
            supervisor: supervisor?,
        })
    }
}
