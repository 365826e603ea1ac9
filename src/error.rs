//! Error types and exit codes for hull-server

use std::net::SocketAddr;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for hull-server operations
#[derive(Error, Debug)]
pub enum HullError {
    #[error("At least 3 points are required to compute a convex hull (got {count}).")]
    InsufficientPoints { count: usize },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HullError {
    /// Convert error to an exit code:
    /// - 0: Success
    /// - 1: IO error
    /// - 2: Bad configuration
    /// - 3: Listener could not be bound
    /// - 4: Geometry failure
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) => ExitCode::from(1),
            Self::Config { .. } => ExitCode::from(2),
            Self::Bind { .. } => ExitCode::from(3),
            Self::InsufficientPoints { .. } => ExitCode::from(4),
        }
    }
}

/// Result type alias for hull-server operations
pub type Result<T> = std::result::Result<T, HullError>;
