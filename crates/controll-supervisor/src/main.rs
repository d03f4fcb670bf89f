mod cli;
mod startup;

use std::sync::Arc;

use clap::Parser;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use controll_api::{ApiClient, PlatformClient, SupervisorClient, TransportConfig};
use controll_config::{load_options, supervisor_token_from_env};
use controll_core::{HeartbeatReporter, ThemeDefinition, run_startup_reconciliation};
use controll_supervisor::{AppState, router};

use crate::cli::Cli;
use crate::startup::StartupError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let mut options = load_options(&cli.options)?;
    if let Some(port) = cli.port {
        options.port = port;
    }
    init_tracing(cli.verbose, options.log_filter()?);

    info!(version = env!("CARGO_PKG_VERSION"), "starting controll-supervisor");

    let supervisor_token = supervisor_token_from_env();
    if supervisor_token.expose_secret().is_empty() {
        warn!("SUPERVISOR_TOKEN is not set, Supervisor calls will be rejected");
    }
    let config = Arc::new(options.to_agent_config(supervisor_token)?);
    if config.credentials.hub_token.is_none() {
        warn!("hub_token is not configured, API requests will be rejected and heartbeats skipped");
    }
    info!(platform_url = %config.platform_url, "platform");
    info!(interval_secs = config.heartbeat_interval.as_secs(), "heartbeat interval");

    let api = ApiClient::new(&TransportConfig::default().with_timeout(config.request_timeout))?;
    let supervisor = SupervisorClient::new(
        api.clone(),
        config.supervisor_url.clone(),
        &config.credentials.supervisor_token,
    )?;
    let platform = PlatformClient::new(api, config.platform_url.clone());
    let state = AppState::new(Arc::clone(&config), supervisor.clone());

    // Failures are logged; the API still starts.
    match run_startup_reconciliation(
        &state.store,
        &ThemeDefinition::vendor_default(),
        &config.brand_name,
    )
    .await
    {
        Ok(report) => info!(
            theme = %report.theme_path.display(),
            branding = ?report.branding,
            theme_registry = ?report.theme_registry,
            persisted = report.persisted,
            "startup reconciliation complete"
        ),
        Err(e) => error!(error = %e, "startup reconciliation failed"),
    }

    let cancel = CancellationToken::new();
    let heartbeat = HeartbeatReporter::new(
        supervisor,
        platform,
        config.credentials.hub_token.clone(),
        config.heartbeat_interval,
    )
    .spawn(cancel.clone());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.listen_addr.to_string(),
            source,
        })?;
    info!(addr = %config.listen_addr, "listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    if let Err(e) = heartbeat.await {
        warn!(error = %e, "heartbeat task ended abnormally");
    }

    served.map_err(|source| StartupError::Serve { source })?;
    info!("shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
