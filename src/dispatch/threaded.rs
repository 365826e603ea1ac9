//! Thread-per-connection dispatch
//!
//! A blocking accept loop; every accepted socket gets its own named OS thread
//! running [`serve_connection`]. Concurrency is unbounded. Worker handles are
//! kept so shutdown can join them, and finished ones are reaped as new
//! connections arrive.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;
use crate::server::ServerContext;

use super::{
    loopback_for, reap_finished, serve_connection, Dispatcher, LiveConnections, ShutdownSignal,
};

/// Back-off after a failed accept, so fd exhaustion does not spin
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

pub struct ThreadedDispatcher {
    buffer_size: usize,
}

impl ThreadedDispatcher {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl Dispatcher for ThreadedDispatcher {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn run(
        self: Box<Self>,
        listener: TcpListener,
        ctx: Arc<ServerContext>,
        shutdown: ShutdownSignal,
    ) -> Result<()> {
        // accept() only returns on a connection, so wake it with one
        let wake_addr = loopback_for(listener.local_addr()?);
        shutdown.on_trigger(move || {
            if let Err(e) = TcpStream::connect(wake_addr) {
                tracing::debug!("[THREADED] wake connect failed: {}", e);
            }
        });

        let live = Arc::new(LiveConnections::new());
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        for incoming in listener.incoming() {
            if shutdown.is_triggered() {
                break;
            }

            let stream = match incoming {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!("[THREADED] accept failed: {}", e);
                    thread::sleep(ACCEPT_RETRY_DELAY);
                    continue;
                }
            };

            reap_finished(&mut workers, "THREADED");

            let ctx = Arc::clone(&ctx);
            let live_for_worker = Arc::clone(&live);
            let buffer_size = self.buffer_size;
            let spawned = thread::Builder::new()
                .name("hull-conn".to_string())
                .spawn(move || serve_connection(stream, &ctx, &live_for_worker, buffer_size));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!("[THREADED] failed to spawn worker: {}", e),
            }
        }

        drop(listener);
        let forced = live.close_all();
        tracing::info!(
            "[THREADED] stopped accepting; closing {} connection(s), joining {} worker(s)",
            forced,
            workers.len()
        );
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("[THREADED] worker panicked");
            }
        }
        Ok(())
    }
}
