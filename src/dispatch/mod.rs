//! Connection dispatch strategies
//!
//! Three interchangeable ways of accepting and servicing connections, all
//! behind the [`Dispatcher`] trait and all driving the same
//! [`Session`](crate::protocol::Session) state machine:
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────┐
//! │ threaded     │ blocking accept loop, one OS thread per connection     │
//! │ reactor      │ one thread, mio readiness loop, per-socket handlers    │
//! │ proactor     │ tokio acceptor task, blocking worker per connection    │
//! └──────────────┴───────────────────────────────────────────────────────┘
//! ```
//!
//! The threaded and proactor strategies share [`serve_connection`]; they
//! differ only in who accepts and how workers are spawned.
//!
//! # Shutdown
//!
//! Every strategy registers a wake hook on the [`ShutdownSignal`] so its
//! blocking wait returns promptly, then stops accepting, drops the listener,
//! force-closes live sockets and joins every worker it started.

pub mod proactor;
pub mod reactor;
pub mod threaded;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::Session;
use crate::server::state::ConnectionId;
use crate::server::ServerContext;

pub use proactor::ProactorDispatcher;
pub use reactor::ReactorDispatcher;
pub use threaded::ThreadedDispatcher;

/// Accept and service connections until shut down
pub trait Dispatcher: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Serve `listener` until `shutdown` fires. Returns once the listener is
    /// closed and no connection handler is left running.
    fn run(
        self: Box<Self>,
        listener: TcpListener,
        ctx: Arc<ServerContext>,
        shutdown: ShutdownSignal,
    ) -> Result<()>;
}

/// Which dispatcher to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One thread per connection
    Threaded,
    /// Single-threaded readiness loop
    Reactor,
    /// Dedicated acceptor handing connections to workers
    #[default]
    Proactor,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Threaded, Strategy::Reactor, Strategy::Proactor];

    /// Build the dispatcher for this strategy
    pub fn dispatcher(self, config: &ServerConfig) -> Box<dyn Dispatcher> {
        match self {
            Self::Threaded => Box::new(ThreadedDispatcher::new(config.read_buffer_size)),
            Self::Reactor => Box::new(ReactorDispatcher::new(
                config.read_buffer_size,
                config.reactor_poll_timeout(),
            )),
            Self::Proactor => Box::new(ProactorDispatcher::new(
                config.read_buffer_size,
                config.proactor_workers,
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Threaded => "threaded",
            Self::Reactor => "reactor",
            Self::Proactor => "proactor",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Shutdown signal
// ============================================================================

type WakeHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    triggered: AtomicBool,
    hooks: Mutex<Vec<WakeHook>>,
}

/// One-shot, cloneable stop request with wake hooks
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Request shutdown and run every registered hook. Idempotent.
    pub fn trigger(&self) {
        let hooks = self.inner.hooks.lock();
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        for hook in hooks.iter() {
            hook();
        }
    }

    /// Run `hook` on trigger, or right away if already triggered.
    pub fn on_trigger<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut hooks = self.inner.hooks.lock();
        if self.is_triggered() {
            drop(hooks);
            hook();
        } else {
            hooks.push(Box::new(hook));
        }
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

// ============================================================================
// Live connection registry
// ============================================================================

/// Clones of every open client socket, so shutdown can force them closed
#[derive(Debug, Default)]
pub struct LiveConnections {
    inner: Mutex<LiveInner>,
}

#[derive(Debug, Default)]
struct LiveInner {
    streams: HashMap<ConnectionId, TcpStream>,
    closed: bool,
}

impl LiveConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `stream`. Fails once [`close_all`](Self::close_all) has run so
    /// a connection accepted during shutdown is turned away.
    pub fn insert(&self, id: ConnectionId, stream: &TcpStream) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "server is shutting down",
            ));
        }
        inner.streams.insert(id, stream.try_clone()?);
        Ok(())
    }

    pub fn remove(&self, id: ConnectionId) {
        self.inner.lock().streams.remove(&id);
    }

    /// Shut down every tracked socket and refuse new ones
    pub fn close_all(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let count = inner.streams.len();
        for (id, stream) in inner.streams.drain() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("{} already closed: {}", id, e);
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Blocking connection handler
// ============================================================================

/// Own one blocking connection until EOF or error.
///
/// Shared by the threaded and proactor strategies. I/O errors end this
/// connection only; they are logged, never propagated.
pub fn serve_connection(
    mut stream: TcpStream,
    ctx: &ServerContext,
    live: &LiveConnections,
    buffer_size: usize,
) {
    let id = ctx.next_connection_id();
    let peer = stream.peer_addr().ok();

    if let Err(e) = live.insert(id, &stream) {
        tracing::warn!("{} from {:?} rejected: {}", id, peer, e);
        let _ = stream.shutdown(Shutdown::Both);
        return;
    }
    tracing::info!("{} connected from {:?}", id, peer);

    let mut session = Session::new(id, ctx.store());
    match pump(&mut stream, &mut session, buffer_size) {
        Ok(()) => tracing::info!("{} closed by peer", id),
        Err(e) => tracing::warn!("{} dropped: {}", id, e),
    }

    drop(session);
    live.remove(id);
    let _ = stream.shutdown(Shutdown::Both);
}

fn pump<S: Read + Write>(stream: &mut S, session: &mut Session, buffer_size: usize) -> io::Result<()> {
    stream.write_all(session.banner().as_bytes())?;

    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let reply = session.handle_bytes(&buf[..n]);
        if !reply.is_empty() {
            stream.write_all(reply.as_bytes())?;
        }
    }
}

/// Join workers that have already exited, keeping the rest
pub(crate) fn reap_finished(workers: &mut Vec<JoinHandle<()>>, strategy: &str) {
    let (finished, running): (Vec<_>, Vec<_>) =
        workers.drain(..).partition(|handle| handle.is_finished());
    *workers = running;
    for handle in finished {
        if handle.join().is_err() {
            tracing::error!("[{}] worker panicked", strategy);
        }
    }
}

/// Address that reaches a listener bound to `local`, for self-wakeups.
pub(crate) fn loopback_for(local: SocketAddr) -> SocketAddr {
    let mut addr = local;
    if addr.ip().is_unspecified() {
        let ip = match addr {
            SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
            SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
        };
        addr.set_ip(ip);
    }
    addr
}
