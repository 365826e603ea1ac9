//! Hull Server: a shared point set served over TCP
//!
//! Clients connect over a line-oriented text protocol to build, edit and
//! query one process-wide set of 2-D points. The server answers with the
//! area of the set's convex hull, and a background monitor reports when that
//! area crosses [`AREA_THRESHOLD`] in either direction.
//!
//! Three interchangeable connection strategies serve the same protocol:
//!
//! - [`Strategy::Threaded`] - one blocking thread per client
//! - [`Strategy::Reactor`] - single-threaded readiness loop over `mio`
//! - [`Strategy::Proactor`] - async acceptor handing clients to blocking workers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hull_server::{Server, ServerConfig, ServerContext, Strategy, ThresholdMonitor};
//!
//! let config = ServerConfig {
//!     strategy: Strategy::Reactor,
//!     ..ServerConfig::default()
//! };
//! let ctx = Arc::new(ServerContext::new());
//! let _monitor = ThresholdMonitor::new(ctx.store()).spawn()?;
//! let handle = Server::bind(&config, ctx)?.spawn()?;
//! println!("listening on {}", handle.local_addr());
//! handle.wait()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod protocol;
pub mod server;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use dispatch::{Dispatcher, LiveConnections, ShutdownSignal, Strategy};
pub use error::{HullError, Result};
pub use geometry::{convex_hull, hull_area, polygon_area, Point};
pub use protocol::{parse_command, parse_point, Command, CommandError, Session, BANNER};
pub use server::{
    ConnectionId, Crossing, MonitorHandle, PointStore, Server, ServerContext, ServerHandle,
    ThresholdMonitor, AREA_THRESHOLD,
};
