//! CLI argument definitions for the hull-server binary

use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;
use crate::dispatch::Strategy;
use crate::error::Result;

/// Convex hull server with a hull-area threshold watcher
#[derive(Parser, Debug)]
#[command(name = "hull-server")]
#[command(about = "Serve a shared point set and report convex hull areas over TCP")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HULL_PORT")]
    pub port: Option<u16>,

    /// Connection dispatch strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,
}

impl Cli {
    /// Build the effective configuration: defaults, then file, then flags
    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }

        config.validate()?;
        Ok(config)
    }
}
