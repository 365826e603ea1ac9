//! Convex hull server
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ServerContext (Arc)                       │
//! │   PointStore: points + pending counts + generation (1 Mutex)     │
//! └──────────────────────────────────────────────────────────────────┘
//!        ▲                         ▲                        ▲
//!        │ Session per connection  │ snapshots              │
//! ┌──────┴──────────┐     ┌────────┴─────────┐              │
//! │   Dispatcher    │     │ ThresholdMonitor │     ServerHandle::shutdown
//! │ threaded/reactor│     │  (own thread)    │
//! │   /proactor     │     └──────────────────┘
//! └─────────────────┘
//! ```
//!
//! The context is built once and passed into everything that needs it;
//! there is no global state.
//!
//! # Modules
//!
//! - `state` - shared point store
//! - `monitor` - hull area threshold watcher

pub mod monitor;
pub mod state;

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, ShutdownSignal};
use crate::error::{HullError, Result};

pub use monitor::{Crossing, MonitorHandle, ThresholdLatch, ThresholdMonitor, AREA_THRESHOLD};
pub use state::{ConnectionId, Observation, PointStore, TransferProgress};

/// State shared by every connection, the dispatcher and the monitor
#[derive(Debug, Default)]
pub struct ServerContext {
    store: Arc<PointStore>,
    next_id: AtomicU64,
}

impl ServerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<PointStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> Arc<PointStore> {
        Arc::clone(&self.store)
    }

    /// Borrow the store without bumping the refcount
    pub fn points(&self) -> &PointStore {
        &self.store
    }

    /// Allocate an identity for a newly accepted connection
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A bound listener plus the dispatcher that will serve it
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    dispatcher: Box<dyn Dispatcher>,
}

impl Server {
    /// Bind the listener for `config`. Bind failure is fatal to startup.
    pub fn bind(config: &ServerConfig, ctx: Arc<ServerContext>) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener =
            TcpListener::bind(addr).map_err(|source| HullError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            ctx,
            dispatcher: config.strategy.dispatcher(config),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Serve on the calling thread until `shutdown` fires
    pub fn run(self, shutdown: ShutdownSignal) -> Result<()> {
        tracing::info!(
            "Server started on {} ({} dispatch)",
            self.local_addr,
            self.dispatcher.name()
        );
        let result = self.dispatcher.run(self.listener, self.ctx, shutdown);
        tracing::info!("Server on {} stopped", self.local_addr);
        result
    }

    /// Serve on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let local_addr = self.local_addr;
        let ctx = Arc::clone(&self.ctx);
        let shutdown = ShutdownSignal::new();

        let signal = shutdown.clone();
        let thread = thread::Builder::new()
            .name("hull-dispatch".to_string())
            .spawn(move || self.run(signal))?;

        Ok(ServerHandle {
            local_addr,
            ctx,
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Owner of a running server. Shuts it down when dropped.
pub struct ServerHandle {
    local_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    shutdown: ShutdownSignal,
    thread: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Signal that stops this server; triggering it is equivalent to `shutdown`
    /// minus the join
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Stop accepting, close every connection and wait for the dispatcher
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    /// Wait for the dispatcher to exit on its own or via the signal
    pub fn wait(mut self) -> Result<()> {
        self.join()
    }

    fn stop(&mut self) -> Result<()> {
        self.shutdown.trigger();
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().unwrap_or_else(|_| {
                Err(HullError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "dispatcher thread panicked",
                )))
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!("Server on {} failed: {}", self.local_addr, e);
        }
    }
}
