//! Clap derive structures for the `controll-supervisor` binary.

use std::path::PathBuf;

use clap::Parser;

use controll_config::DEFAULT_OPTIONS_PATH;

/// controll-supervisor -- keeps a Home Assistant hub branded and reachable
#[derive(Debug, Parser)]
#[command(
    name = "controll-supervisor",
    version,
    about = "Home Assistant add-on for the Controll platform",
    long_about = "Reconciles Controll branding into configuration.yaml at startup,\n\
        reports heartbeats to the platform and serves the management API."
)]
pub struct Cli {
    /// Add-on options rendered by the Supervisor
    #[arg(long, env = "CONTROLL_OPTIONS", default_value = DEFAULT_OPTIONS_PATH)]
    pub options: PathBuf,

    /// Listen port (overrides options)
    #[arg(long, env = "CONTROLL_PORT")]
    pub port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}
