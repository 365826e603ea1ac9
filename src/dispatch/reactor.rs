//! Single-threaded reactor dispatch
//!
//! One cooperative loop over `mio::Poll`. Every registered socket has an
//! [`EventHandler`]; each pass waits (bounded by the poll timeout) for
//! readiness, then runs the handler of every ready socket to completion, one
//! at a time.
//!
//! Handlers may register new sockets and deregister any socket, including
//! their own or one that is ready later in the same pass. The pass walks the
//! ready set that `poll` returned and looks each handler up again right
//! before running it, so a handler removed earlier in the pass is skipped.
//!
//! mio is edge-triggered: client handlers read until `WouldBlock` and keep
//! unsent replies in an outbox, asking for writability only while it is
//! non-empty. A client that half-closes stays registered, write-only, until
//! its outbox has drained.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use mio::event::{Event, Source};
use mio::net::{TcpListener as MioListener, TcpStream as MioStream};
use mio::{Events, Interest, Poll, Registry, Token, Waker};

use crate::error::Result;
use crate::protocol::Session;
use crate::server::ServerContext;

use super::{Dispatcher, ShutdownSignal};

/// Reserved for the cross-thread waker
const WAKE_TOKEN: Token = Token(0);

/// What the reactor should do with a handler after it ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Per-socket readiness callback
pub trait EventHandler {
    /// The socket this handler services
    fn source(&mut self) -> &mut dyn Source;

    /// Interest used when the handler is first registered
    fn interest(&self) -> Interest {
        Interest::READABLE
    }

    /// Called when the socket is ready. Runs to completion.
    fn on_event(&mut self, event: &Event, ctx: &mut ReactorContext<'_>) -> Flow;
}

#[derive(Default)]
struct Registrations {
    handlers: HashMap<Token, Box<dyn EventHandler>>,
    next_token: usize,
}

impl Registrations {
    fn insert(&mut self, registry: &Registry, mut handler: Box<dyn EventHandler>) -> io::Result<Token> {
        self.next_token += 1;
        let token = Token(self.next_token);
        let interest = handler.interest();
        registry.register(handler.source(), token, interest)?;
        self.handlers.insert(token, handler);
        Ok(token)
    }

    fn remove(&mut self, registry: &Registry, token: Token) -> Option<Box<dyn EventHandler>> {
        let mut handler = self.handlers.remove(&token)?;
        if let Err(e) = registry.deregister(handler.source()) {
            tracing::debug!("[REACTOR] deregister {:?} failed: {}", token, e);
        }
        Some(handler)
    }
}

/// View of the reactor handed to a running handler
pub struct ReactorContext<'a> {
    registry: &'a Registry,
    registrations: &'a mut Registrations,
    current: Token,
    current_removed: bool,
}

impl ReactorContext<'_> {
    /// Token of the handler currently running
    pub fn token(&self) -> Token {
        self.current
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Register another socket with its handler
    pub fn register(&mut self, handler: Box<dyn EventHandler>) -> io::Result<Token> {
        self.registrations.insert(self.registry, handler)
    }

    /// Deregister and drop the handler for `token`.
    ///
    /// Deregistering the running handler takes effect when it returns.
    pub fn deregister(&mut self, token: Token) -> bool {
        if token == self.current {
            self.current_removed = true;
            return true;
        }
        self.registrations.remove(self.registry, token).is_some()
    }
}

/// mio-backed readiness loop
pub struct Reactor {
    poll: Poll,
    registrations: Registrations,
    waker: Arc<Waker>,
    poll_timeout: Duration,
}

impl Reactor {
    pub fn new(poll_timeout: Duration) -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        Ok(Self {
            poll,
            registrations: Registrations::default(),
            waker,
            poll_timeout,
        })
    }

    /// Handle that interrupts a blocked `poll` from another thread
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    pub fn register(&mut self, handler: Box<dyn EventHandler>) -> io::Result<Token> {
        self.registrations.insert(self.poll.registry(), handler)
    }

    pub fn deregister(&mut self, token: Token) -> bool {
        self.registrations
            .remove(self.poll.registry(), token)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.registrations.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll and dispatch until `stop` returns true
    pub fn run_until<F>(&mut self, mut stop: F) -> io::Result<()>
    where
        F: FnMut() -> bool,
    {
        let mut events = Events::with_capacity(256);
        while !stop() {
            match self.poll.poll(&mut events, Some(self.poll_timeout)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            self.dispatch(&events);
        }
        Ok(())
    }

    fn dispatch(&mut self, events: &Events) {
        let registry = self.poll.registry();
        for event in events.iter() {
            let token = event.token();
            if token == WAKE_TOKEN {
                continue;
            }
            // Removed earlier in this pass
            let Some(mut handler) = self.registrations.handlers.remove(&token) else {
                continue;
            };

            let mut ctx = ReactorContext {
                registry,
                registrations: &mut self.registrations,
                current: token,
                current_removed: false,
            };
            let flow = handler.on_event(event, &mut ctx);

            if flow == Flow::Close || ctx.current_removed {
                if let Err(e) = registry.deregister(handler.source()) {
                    tracing::debug!("[REACTOR] deregister {:?} failed: {}", token, e);
                }
            } else {
                self.registrations.handlers.insert(token, handler);
            }
        }
    }

    /// Deregister and drop every handler, closing their sockets
    pub fn close_all(&mut self) -> usize {
        let tokens: Vec<Token> = self.registrations.handlers.keys().copied().collect();
        for token in &tokens {
            self.registrations.remove(self.poll.registry(), *token);
        }
        tokens.len()
    }
}

// ============================================================================
// Server handlers
// ============================================================================

/// Accepts every pending connection and registers a [`ClientHandler`] for it
struct AcceptHandler {
    listener: MioListener,
    ctx: Arc<ServerContext>,
    buffer_size: usize,
}

impl EventHandler for AcceptHandler {
    fn source(&mut self) -> &mut dyn Source {
        &mut self.listener
    }

    fn on_event(&mut self, _event: &Event, ctx: &mut ReactorContext<'_>) -> Flow {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let client = ClientHandler::new(stream, peer, &self.ctx, self.buffer_size);
                    let id = client.session.id();
                    match ctx.register(Box::new(client)) {
                        Ok(token) => tracing::info!("{} connected from {} ({:?})", id, peer, token),
                        Err(e) => tracing::error!("[REACTOR] failed to register {}: {}", id, e),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Flow::Continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Keep the listener; the next readiness event retries
                    tracing::error!("[REACTOR] accept failed: {}", e);
                    return Flow::Continue;
                }
            }
        }
    }
}

/// One client connection: socket, protocol session and unsent replies
struct ClientHandler {
    stream: MioStream,
    peer: SocketAddr,
    session: Session,
    outbox: Vec<u8>,
    buf: Vec<u8>,
    /// Interest currently registered with the poll
    interest: Interest,
    /// Peer sent EOF; only the outbox is left to deliver
    draining: bool,
}

impl ClientHandler {
    fn new(stream: MioStream, peer: SocketAddr, ctx: &ServerContext, buffer_size: usize) -> Self {
        let session = Session::new(ctx.next_connection_id(), ctx.store());
        let outbox = session.banner().as_bytes().to_vec();
        Self {
            stream,
            peer,
            session,
            outbox,
            buf: vec![0u8; buffer_size.max(1)],
            interest: Interest::READABLE | Interest::WRITABLE,
            draining: false,
        }
    }

    /// Read until the socket would block. `Ok(false)` means the peer closed.
    fn read_available(&mut self) -> io::Result<bool> {
        loop {
            match self.stream.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    let reply = self.session.handle_bytes(&self.buf[..n]);
                    self.outbox.extend_from_slice(reply.as_bytes());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Write as much of the outbox as the socket accepts
    fn flush(&mut self) -> io::Result<()> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn service(&mut self, event: &Event, ctx: &mut ReactorContext<'_>) -> io::Result<Flow> {
        if !self.draining && (event.is_readable() || event.is_read_closed()) {
            self.draining = !self.read_available()?;
        }
        self.flush()?;

        let interest = match (self.draining, self.outbox.is_empty()) {
            (true, true) => return Ok(Flow::Close),
            (true, false) => Interest::WRITABLE,
            (false, false) => Interest::READABLE | Interest::WRITABLE,
            (false, true) => Interest::READABLE,
        };
        if interest != self.interest {
            let token = ctx.token();
            ctx.registry().reregister(&mut self.stream, token, interest)?;
            self.interest = interest;
        }
        Ok(Flow::Continue)
    }
}

impl EventHandler for ClientHandler {
    fn source(&mut self) -> &mut dyn Source {
        &mut self.stream
    }

    fn interest(&self) -> Interest {
        self.interest
    }

    fn on_event(&mut self, event: &Event, ctx: &mut ReactorContext<'_>) -> Flow {
        match self.service(event, ctx) {
            Ok(Flow::Continue) => Flow::Continue,
            Ok(Flow::Close) => {
                tracing::info!("{} closed by peer {}", self.session.id(), self.peer);
                Flow::Close
            }
            Err(e) => {
                tracing::warn!("{} dropped: {}", self.session.id(), e);
                Flow::Close
            }
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

pub struct ReactorDispatcher {
    buffer_size: usize,
    poll_timeout: Duration,
}

impl ReactorDispatcher {
    pub fn new(buffer_size: usize, poll_timeout: Duration) -> Self {
        Self {
            buffer_size,
            poll_timeout,
        }
    }
}

impl Dispatcher for ReactorDispatcher {
    fn name(&self) -> &'static str {
        "reactor"
    }

    fn run(
        self: Box<Self>,
        listener: TcpListener,
        ctx: Arc<ServerContext>,
        shutdown: ShutdownSignal,
    ) -> Result<()> {
        listener.set_nonblocking(true)?;
        let mut reactor = Reactor::new(self.poll_timeout)?;

        reactor.register(Box::new(AcceptHandler {
            listener: MioListener::from_std(listener),
            ctx,
            buffer_size: self.buffer_size,
        }))?;

        let waker = reactor.waker();
        shutdown.on_trigger(move || {
            if let Err(e) = waker.wake() {
                tracing::debug!("[REACTOR] wake failed: {}", e);
            }
        });

        reactor.run_until(|| shutdown.is_triggered())?;

        // Listener included
        let closed = reactor.close_all();
        tracing::info!("[REACTOR] stopped; closed {} socket(s)", closed);
        Ok(())
    }
}
