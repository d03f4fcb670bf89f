// controll-core: Configuration reconciliation, heartbeat and auth gate for controll-supervisor.

pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod heartbeat;
pub mod reconcile;
pub mod store;
pub mod theme;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AgentConfig, Credentials};
pub use document::ConfigDocument;
pub use error::CoreError;
pub use heartbeat::{CycleOutcome, HeartbeatReporter, device_id};
pub use reconcile::{
    DEFAULT_BRAND_NAME, Outcome, StartupReport, ensure_branding, ensure_theme_registry,
    run_startup_reconciliation,
};
pub use store::{ConfigStore, DocumentUpdate, FileEntry};
pub use theme::ThemeDefinition;
