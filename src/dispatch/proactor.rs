//! Proactor dispatch: acceptance decoupled from service
//!
//! A tokio task owns the listener and does nothing but accept. Each accepted
//! socket is converted back to a blocking `std` stream and handed to its own
//! named OS thread running the same [`serve_connection`] as the threaded
//! strategy. There is no worker pool, so the number of clients served at
//! once is bounded only by the OS. Worker handles are kept and joined on
//! shutdown, so none outlives the dispatcher.
//!
//! ```text
//! ┌──────────────────┐  accept   ┌─────────────────┐
//! │ acceptor (tokio) │──────────>│ worker (thread) │  x N
//! └──────────────────┘           └─────────────────┘
//! ```

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::Result;
use crate::server::ServerContext;

use super::{reap_finished, serve_connection, Dispatcher, LiveConnections, ShutdownSignal};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);

pub struct ProactorDispatcher {
    buffer_size: usize,
    acceptor_threads: usize,
}

impl ProactorDispatcher {
    pub fn new(buffer_size: usize, acceptor_threads: usize) -> Self {
        Self {
            buffer_size,
            acceptor_threads: acceptor_threads.max(1),
        }
    }

    /// Accept until shutdown; returns the handles of workers still running
    async fn accept_loop(
        &self,
        listener: TcpListener,
        ctx: Arc<ServerContext>,
        live: Arc<LiveConnections>,
        shutdown: ShutdownSignal,
    ) -> Result<Vec<JoinHandle<()>>> {
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;

        // notify_one keeps a permit, so a trigger before the first await is not lost
        let stop = Arc::new(Notify::new());
        {
            let stop = Arc::clone(&stop);
            shutdown.on_trigger(move || stop.notify_one());
        }

        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = stop.notified() => break,

                accepted = listener.accept() => {
                    let stream = match accepted.and_then(|(stream, _)| stream.into_std()) {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::error!("[PROACTOR] accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                            continue;
                        }
                    };

                    reap_finished(&mut workers, "PROACTOR");
                    if let Some(handle) = self.hand_off(stream, &ctx, &live) {
                        workers.push(handle);
                    }
                }
            }
        }

        Ok(workers)
    }

    /// Start a dedicated worker thread for `stream`
    fn hand_off(
        &self,
        stream: TcpStream,
        ctx: &Arc<ServerContext>,
        live: &Arc<LiveConnections>,
    ) -> Option<JoinHandle<()>> {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::error!("[PROACTOR] could not make socket blocking: {}", e);
            return None;
        }

        let ctx = Arc::clone(ctx);
        let live = Arc::clone(live);
        let buffer_size = self.buffer_size;
        let spawned = thread::Builder::new()
            .name("hull-proactor-conn".to_string())
            .spawn(move || serve_connection(stream, &ctx, &live, buffer_size));

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("[PROACTOR] failed to spawn worker: {}", e);
                None
            }
        }
    }
}

impl Dispatcher for ProactorDispatcher {
    fn name(&self) -> &'static str {
        "proactor"
    }

    fn run(
        self: Box<Self>,
        listener: TcpListener,
        ctx: Arc<ServerContext>,
        shutdown: ShutdownSignal,
    ) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.acceptor_threads)
            .thread_name("hull-proactor")
            .enable_all()
            .build()?;

        let live = Arc::new(LiveConnections::new());
        let workers = runtime.block_on(self.accept_loop(listener, ctx, Arc::clone(&live), shutdown))?;
        // Listener closed with the acceptor task
        drop(runtime);

        let forced = live.close_all();
        tracing::info!(
            "[PROACTOR] stopped accepting; closing {} connection(s), joining {} worker(s)",
            forced,
            workers.len()
        );
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("[PROACTOR] worker panicked");
            }
        }
        Ok(())
    }
}
