//! Line-oriented text protocol
//!
//! # Commands
//!
//! ```text
//! Newgraph <n>          start an n-line point transfer (clears the point set)
//! <x>,<y>               one point, only while a transfer is in progress
//! CH                    compute the hull area of the current point set
//! Newpoint <x>,<y>      add one point
//! Removepoint <x>,<y>   remove the first exactly matching point
//! ```
//!
//! Lines end in LF or CRLF. Every non-empty line gets exactly one reply line.

pub mod command;
pub mod framing;
pub mod session;

pub use command::{parse_command, parse_point, Command, CommandError};
pub use framing::LineFramer;
pub use session::{Session, SessionState, BANNER};
