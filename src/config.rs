//! Server configuration
//!
//! Defaults work out of the box; an optional TOML file overrides them and
//! command-line flags override the file:
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 9034
//! strategy = "reactor"
//! read_buffer_size = 1024
//! reactor_poll_timeout_ms = 1000
//! proactor_workers = 1
//! ```

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::Strategy;
use crate::error::{HullError, Result};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 9034;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Connection dispatch strategy
    pub strategy: Strategy,
    /// Bytes requested per socket read
    pub read_buffer_size: usize,
    /// Upper bound on one reactor wait, so registration changes are seen
    pub reactor_poll_timeout_ms: u64,
    /// Runtime threads driving the proactor's acceptor
    pub proactor_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            strategy: Strategy::default(),
            read_buffer_size: 1024,
            reactor_poll_timeout_ms: 1000,
            proactor_workers: 1,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| HullError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| HullError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(HullError::Config {
                message: "read_buffer_size must be at least 1".to_string(),
            });
        }
        if self.reactor_poll_timeout_ms == 0 {
            return Err(HullError::Config {
                message: "reactor_poll_timeout_ms must be at least 1".to_string(),
            });
        }
        if self.proactor_workers == 0 {
            return Err(HullError::Config {
                message: "proactor_workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn reactor_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.reactor_poll_timeout_ms)
    }

    /// Resolve `host:port` to the address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| HullError::Config {
                message: format!("cannot resolve {}:{}: {}", self.host, self.port, e),
            })?
            .next()
            .ok_or_else(|| HullError::Config {
                message: format!("{}:{} resolves to no address", self.host, self.port),
            })
    }
}
