// ── Core error types ──
//
// Domain errors for reconciliation, file access and outbound calls.
// `controll_api::Error` is folded into `Transport`/`Timeout` so callers
// never match on reqwest details.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    // ── Persistence ──────────────────────────────────────────────────
    /// File-system failure. `path` is for logs only and must not be
    /// echoed to remote callers.
    #[error("Failed to {action} {}: {source}", path.display())]
    Persistence {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Transport ────────────────────────────────────────────────────
    #[error("Remote call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Remote call failed: {message}")]
    Transport {
        message: String,
        /// HTTP status code (if a response was received).
        status: Option<u16>,
    },
}

impl CoreError {
    pub(crate) fn persistence(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Persistence {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised by an outbound call.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<controll_api::Error> for CoreError {
    fn from(err: controll_api::Error) -> Self {
        match err {
            controll_api::Error::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            controll_api::Error::Transport(ref e) if e.is_timeout() => {
                Self::Timeout { timeout_secs: 0 }
            }
            controll_api::Error::Status { status, body } => Self::Transport {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            other => Self::Transport {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
