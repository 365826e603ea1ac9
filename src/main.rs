//! Hull Server entry point
//!
//! # Usage
//!
//! ```bash
//! hull-server
//! hull-server --port 9034 --strategy reactor
//! hull-server --config hull.toml
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use hull_server::cli::Cli;
use hull_server::{HullError, Server, ServerContext, ThresholdMonitor};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hull_server=info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> hull_server::Result<()> {
    let cli = Cli::parse();
    let config = cli.server_config()?;

    let ctx = Arc::new(ServerContext::new());
    let monitor = ThresholdMonitor::new(ctx.store()).spawn()?;

    let server = Server::bind(&config, Arc::clone(&ctx))?;
    println!(
        "Convex hull server listening on {} ({})",
        server.local_addr(),
        config.strategy
    );
    let handle = server.spawn()?;

    wait_for_ctrl_c()?;
    tracing::info!("Interrupt received, shutting down");

    let result = handle.shutdown();
    monitor.stop();
    result
}

fn wait_for_ctrl_c() -> hull_server::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .map_err(HullError::Io)
}
