//! HTTP API routes.

use axum::{
    Json, Router,
    extract::{
        Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use controll_core::reconcile::{self, Outcome};
use controll_core::theme::DEFAULT_THEME_NAME;
use controll_core::{DEFAULT_BRAND_NAME, ThemeDefinition, auth};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Name reported by `/health`.
pub const ADDON_NAME: &str = "controll-supervisor";

/// Build the router with all routes.
///
/// Everything except `/health` sits behind the hub-token check.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        // Files
        .route("/api/file/write", post(file_write))
        .route("/api/file/read", get(file_read))
        .route("/api/file/list", get(file_list))
        // Home Assistant
        .route("/api/ha/service", post(ha_service))
        .route("/api/ha/restart", post(ha_restart))
        .route("/api/ha/config", get(ha_config))
        .route("/api/ha/states", get(ha_states))
        // Add-ons
        .route("/api/addons", get(addon_list))
        .route("/api/addons/install", post(addon_install))
        // System
        .route("/api/system/info", get(system_info))
        // Branding
        .route("/api/theme/install", post(theme_install))
        .route("/api/branding", post(branding))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_hub_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_hub_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !auth::authorize(request.headers(), state.hub_token()) {
        warn!(path = %request.uri().path(), "rejected unauthorized request");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    addon: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn health() -> impl IntoResponse {
    let body = HealthResponse {
        status: "healthy",
        addon: ADDON_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (
        [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")],
        Json(body),
    )
}

// ============================================================================
// Files
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileWriteRequest {
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

/// Write a file below the config directory.
async fn file_write(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FileWriteRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    state.store.write_file(&req.path, &req.content).await?;
    info!(path = %req.path, "wrote file");
    Ok(Json(json!({ "success": true, "path": req.path })))
}

async fn file_read(
    State(state): State<AppState>,
    query: std::result::Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(q) = query?;
    let content = state.store.read_file(&q.path).await?;
    Ok(Json(json!({ "success": true, "content": content })))
}

/// List a directory; an empty path lists the config root.
async fn file_list(
    State(state): State<AppState>,
    query: std::result::Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(q) = query?;
    let files = state.store.list_dir(&q.path).await?;
    Ok(Json(json!({ "success": true, "files": files })))
}

// ============================================================================
// Home Assistant
// ============================================================================

#[derive(Debug, Deserialize)]
struct ServiceRequest {
    domain: String,
    service: String,
    #[serde(default = "empty_object")]
    data: Value,
}

fn empty_object() -> Value {
    json!({})
}

async fn ha_service(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ServiceRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    require_identifier("domain", &req.domain)?;
    require_identifier("service", &req.service)?;

    let result = state
        .supervisor
        .call_service(&req.domain, &req.service, &req.data)
        .await?;
    Ok(Json(json!({ "success": true, "result": result })))
}

async fn ha_restart(State(state): State<AppState>) -> Result<Json<Value>> {
    state.supervisor.restart_core().await?;
    info!("Home Assistant restart requested");
    Ok(Json(json!({ "success": true, "message": "Restart initiated" })))
}

async fn ha_config(State(state): State<AppState>) -> Result<Json<Value>> {
    let config = state.supervisor.ha_config().await?;
    Ok(Json(json!({ "success": true, "config": config })))
}

async fn ha_states(State(state): State<AppState>) -> Result<Json<Value>> {
    let states = state.supervisor.states().await?;
    Ok(Json(json!({ "success": true, "states": states })))
}

// ============================================================================
// Add-ons / system
// ============================================================================

#[derive(Debug, Deserialize)]
struct AddonInstallRequest {
    slug: String,
}

async fn addon_list(State(state): State<AppState>) -> Result<Json<Value>> {
    let addons = state.supervisor.addons().await?;
    Ok(Json(json!({ "success": true, "addons": addons })))
}

async fn addon_install(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddonInstallRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    require_identifier("slug", &req.slug)?;

    state.supervisor.install_addon(&req.slug).await?;
    info!(slug = %req.slug, "add-on install requested");
    Ok(Json(json!({
        "success": true,
        "message": format!("Installing {}", req.slug),
    })))
}

async fn system_info(State(state): State<AppState>) -> Result<Json<Value>> {
    let info = state.supervisor.system_info().await?;
    Ok(Json(json!({ "success": true, "info": info })))
}

// ============================================================================
// Branding
// ============================================================================

#[derive(Debug, Deserialize)]
struct ThemeInstallRequest {
    #[serde(default = "default_theme_name")]
    name: String,
    content: String,
}

fn default_theme_name() -> String {
    DEFAULT_THEME_NAME.into()
}

#[derive(Debug, Deserialize)]
struct BrandingRequest {
    #[serde(default = "default_brand_name")]
    name: String,
}

fn default_brand_name() -> String {
    DEFAULT_BRAND_NAME.into()
}

#[derive(Debug, Serialize)]
struct ReconcileResponse {
    success: bool,
    message: String,
    restart_required: bool,
}

/// Install a theme file and make sure the theme registry is configured.
async fn theme_install(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ThemeInstallRequest>, JsonRejection>,
) -> Result<Json<ReconcileResponse>> {
    let Json(req) = payload?;
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Theme content must not be empty".into()));
    }
    let theme = ThemeDefinition::new(req.name, req.content)?;

    state.store.install_theme(&theme).await?;
    let update = state
        .store
        .update_document(reconcile::ensure_theme_registry)
        .await?;

    let message = match update.result {
        Outcome::ManualUpdateRequired => format!(
            "Theme '{}' installed. Add `{}` under frontend: in configuration.yaml, then restart HA.",
            theme.name(),
            reconcile::THEME_REGISTRY_ENTRY
        ),
        Outcome::Changed | Outcome::AlreadyConfigured => {
            format!("Theme '{}' installed. Restart HA to apply.", theme.name())
        }
    };

    Ok(Json(ReconcileResponse {
        success: true,
        message,
        restart_required: true,
    }))
}

/// Ensure the hub display name is configured.
async fn branding(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BrandingRequest>, JsonRejection>,
) -> Result<Json<ReconcileResponse>> {
    let Json(req) = payload?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".into()));
    }

    let update = state
        .store
        .update_document(|doc| reconcile::ensure_branding(doc, name))
        .await?;

    let message = match update.result? {
        Outcome::Changed => format!("Branding set to '{name}'. Restart HA to apply."),
        Outcome::AlreadyConfigured | Outcome::ManualUpdateRequired => {
            "Branding already configured; existing name left unchanged.".to_owned()
        }
    };

    Ok(Json(ReconcileResponse {
        success: true,
        message,
        restart_required: true,
    }))
}

/// Upstream path segments: `light`, `turn_on`, `core_mosquitto`, `a0d7b954_vscode`.
fn require_identifier(field: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid {field}")))
    }
}
