//! Server fixture bound to 127.0.0.1 on a free port

use std::net::SocketAddr;
use std::sync::Arc;

use hull_server::{PointStore, Server, ServerConfig, ServerContext, ServerHandle, Strategy};

use super::LineClient;

/// A running server that shuts itself down when dropped
pub struct TestServer {
    strategy: Strategy,
    handle: Option<ServerHandle>,
    ctx: Arc<ServerContext>,
}

impl TestServer {
    pub fn start(strategy: Strategy) -> Self {
        Self::start_with_context(strategy, Arc::new(ServerContext::new()))
    }

    pub fn start_with_context(strategy: Strategy, ctx: Arc<ServerContext>) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            strategy,
            reactor_poll_timeout_ms: 100,
            ..ServerConfig::default()
        };
        let handle = Server::bind(&config, Arc::clone(&ctx))
            .expect("Failed to bind test server")
            .spawn()
            .expect("Failed to spawn test server");

        Self {
            strategy,
            handle: Some(handle),
            ctx,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn addr(&self) -> SocketAddr {
        self.handle
            .as_ref()
            .map(|h| h.local_addr())
            .expect("Server already shut down")
    }

    pub fn store(&self) -> Arc<PointStore> {
        self.ctx.store()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Connect and consume the banner
    pub fn connect(&self) -> LineClient {
        LineClient::connect(self.addr())
    }

    /// Stop the server and wait for every connection handler to finish
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown().expect("Server shutdown failed");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.shutdown();
        }
    }
}

/// Run `test` once against a fresh server per dispatch strategy
pub fn for_each_strategy<F>(mut test: F)
where
    F: FnMut(&TestServer),
{
    for strategy in Strategy::ALL {
        let server = TestServer::start(strategy);
        test(&server);
    }
}
