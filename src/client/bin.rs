//! Hull Client Binary
//!
//! Interactive terminal client for hull-server.
//!
//! # Usage
//!
//! ```bash
//! hull-client
//! hull-client --host 10.0.0.5 --port 9034
//! ```

use std::io;
use std::net::TcpStream;

use anyhow::Context;
use clap::Parser;

use hull_server::client::run_session;
use hull_server::config::DEFAULT_PORT;

/// Hull Server Client
#[derive(Parser, Debug)]
#[command(name = "hull-client")]
#[command(about = "Interactive client for the convex hull server")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "HULL_PORT")]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hull_server=warn")),
        )
        .init();

    let args = Args::parse();
    let stream = TcpStream::connect((args.host.as_str(), args.port))
        .with_context(|| format!("failed to connect to {}:{}", args.host, args.port))?;

    run_session(stream, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
