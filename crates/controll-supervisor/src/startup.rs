//! Fatal startup errors with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use controll_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const BIND: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum StartupError {
    #[error("Options file not found: {path}")]
    #[diagnostic(
        code(controll::missing_options),
        help(
            "The Supervisor renders add-on options to /data/options.json.\n\
             Outside the add-on, pass --options <file> or set CONTROLL_OPTIONS."
        )
    )]
    MissingOptions { path: String },

    #[error("Invalid configuration")]
    #[diagnostic(
        code(controll::config),
        help("Check the add-on options and any CONTROLL_* environment variables.")
    )]
    Config {
        #[source]
        source: ConfigError,
    },

    #[error("Could not build HTTP client")]
    #[diagnostic(code(controll::http_client))]
    Client {
        #[source]
        source: controll_api::Error,
    },

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(controll::bind),
        help("Another process may already use this port. Try --port <port>.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed")]
    #[diagnostic(code(controll::serve))]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingOptions { .. } | Self::Config { .. } => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::BIND,
            Self::Client { .. } | Self::Serve { .. } => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingOptions { path } => Self::MissingOptions {
                path: path.display().to_string(),
            },
            other => Self::Config { source: other },
        }
    }
}

impl From<controll_api::Error> for StartupError {
    fn from(err: controll_api::Error) -> Self {
        Self::Client { source: err }
    }
}
