//! CLI entrypoint for review-relay
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _log_guard = logging::init(cli.verbose, cli.log_dir.as_deref())?;

    match cli.command {
        Command::Run => {
            info!("Starting review-relay");
            let audit = commands::audit_logger(cli.audit_log.as_deref())?;
            commands::run(cli.config, audit).await
        }
        Command::Propagate { event } => {
            let audit = commands::audit_logger(cli.audit_log.as_deref())?;
            commands::propagate(cli.config, &event, audit).await
        }
        Command::Sync { project } => {
            let audit = commands::audit_logger(cli.audit_log.as_deref())?;
            commands::sync(cli.config, &project, audit).await
        }
        Command::CheckConfig => commands::check_config(cli.config.as_deref()),
    }
}
