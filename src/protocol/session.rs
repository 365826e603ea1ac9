//! Per-connection protocol state machine
//!
//! ```text
//!            Newgraph n (n >= 1)
//!   ┌──────┐ ─────────────────────> ┌────────────────────────────┐
//!   │ Idle │                        │ AwaitingPoints { remaining }│
//!   └──────┘ <───────────────────── └────────────────────────────┘
//!              last point received     malformed line: unchanged
//! ```
//!
//! While points are awaited every line is read as a coordinate pair, so
//! normal commands are unreachable until the countdown reaches zero. The
//! session never touches a socket: it takes bytes in and hands reply text
//! back to whichever dispatcher owns the connection.

use std::sync::Arc;

use crate::error::HullError;
use crate::server::state::{ConnectionId, PointStore, TransferProgress};

use super::command::{parse_command, parse_point, Command};
use super::framing::LineFramer;

/// Sent once when a client connects
pub const BANNER: &str = "Welcome to the Convex Hull Server!\n";

/// Where a connection is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingPoints { remaining: usize },
}

/// Protocol state for one connection.
///
/// Dropping the session releases the connection's pending count.
pub struct Session {
    id: ConnectionId,
    store: Arc<PointStore>,
    framer: LineFramer,
    state: SessionState,
}

impl Session {
    pub fn new(id: ConnectionId, store: Arc<PointStore>) -> Self {
        Self {
            id,
            store,
            framer: LineFramer::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Banner to send before any input is read
    pub fn banner(&self) -> &'static str {
        BANNER
    }

    /// Feed raw bytes from the socket; returns the reply bytes to send back
    /// (possibly empty).
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> String {
        let mut replies = String::new();
        for line in self.framer.push(bytes) {
            if let Some(reply) = self.handle_line(&line) {
                replies.push_str(&reply);
            }
        }
        replies
    }

    /// Handle one framed line. Empty lines produce no reply.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return None;
        }
        tracing::debug!("{} <- {:?}", self.id, line);

        let reply = match self.state {
            SessionState::AwaitingPoints { .. } => self.handle_point_line(line),
            SessionState::Idle => self.handle_command_line(line),
        };
        Some(reply)
    }

    fn handle_point_line(&mut self, line: &str) -> String {
        let Some(point) = parse_point(line) else {
            return "Invalid point format. Example: 1,2\n".to_string();
        };

        match self.store.consume_pending(self.id, point) {
            Some(TransferProgress {
                remaining: 0,
                total_points,
            }) => {
                self.state = SessionState::Idle;
                format!("Graph updated with {} points.\n", total_points)
            }
            Some(TransferProgress { remaining, .. }) => {
                self.state = SessionState::AwaitingPoints { remaining };
                format!("Point added. {} more to go.\n", remaining)
            }
            None => {
                // Store has no transfer on record for us; fall back to commands
                tracing::warn!("{} lost its pending transfer", self.id);
                self.state = SessionState::Idle;
                self.handle_command_line(line)
            }
        }
    }

    fn handle_command_line(&mut self, line: &str) -> String {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => return format!("{}\n", e),
        };

        match command {
            Command::NewGraph { count } => {
                if self.store.reset(self.id, count) {
                    self.state = SessionState::AwaitingPoints { remaining: count };
                    format!("OK. Send {} points (x,y per line):\n", count)
                } else {
                    "Invalid usage. Example: Newgraph 4\n".to_string()
                }
            }
            Command::ComputeHull => match self.store.hull_area() {
                Ok(area) => format!("Convex hull area: {}\n", area),
                Err(HullError::InsufficientPoints { .. }) => {
                    "Need at least 3 points to compute convex hull.\n".to_string()
                }
                Err(e) => format!("Error: {}\n", e),
            },
            Command::NewPoint(point) => {
                self.store.add_point(point);
                format!("Point {} added.\n", point)
            }
            Command::RemovePoint(point) => {
                if self.store.remove_point(point) {
                    format!("Point {} removed.\n", point)
                } else {
                    format!("Point {} not found.\n", point)
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.store.forget_connection(self.id);
    }
}
