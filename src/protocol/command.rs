//! Command line parsing
//!
//! The keyword is the first whitespace-separated token and is case-sensitive.
//! Coordinates use a comma separator: commas are treated as whitespace and
//! the first two tokens must be finite `f32` values. Anything after them is
//! ignored.

use thiserror::Error;

use crate::geometry::Point;

/// A parsed client command (normal mode only)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `Newgraph <n>`
    NewGraph { count: usize },
    /// `CH`
    ComputeHull,
    /// `Newpoint <x>,<y>`
    NewPoint(Point),
    /// `Removepoint <x>,<y>`
    RemovePoint(Point),
}

/// Why a line was not a valid command. `Display` is the reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid usage. Example: Newgraph 4")]
    NewGraphUsage,

    #[error("Invalid usage. Example: Newpoint 1,2")]
    NewPointUsage,

    #[error("Invalid usage. Example: Removepoint 1,2")]
    RemovePointUsage,

    #[error("Unknown command.")]
    Unknown,
}

/// Parse a coordinate pair such as `1,2` or `1.5, -3`.
pub fn parse_point(text: &str) -> Option<Point> {
    let normalized = text.replace(',', " ");
    let mut tokens = normalized.split_whitespace();

    let mut coord = || {
        tokens
            .next()
            .and_then(|t| t.parse::<f32>().ok())
            .filter(|v| v.is_finite())
    };
    let x = coord()?;
    let y = coord()?;
    Some(Point::new(x, y))
}

/// Parse one non-empty line in normal command mode.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_whitespace();

    match tokens.next() {
        Some("Newgraph") => tokens
            .next()
            .and_then(|t| t.parse::<usize>().ok())
            .filter(|&n| n >= 1)
            .map(|count| Command::NewGraph { count })
            .ok_or(CommandError::NewGraphUsage),
        Some("CH") => Ok(Command::ComputeHull),
        // Only the first token after the keyword carries coordinates
        Some("Newpoint") => tokens
            .next()
            .and_then(parse_point)
            .map(Command::NewPoint)
            .ok_or(CommandError::NewPointUsage),
        Some("Removepoint") => tokens
            .next()
            .and_then(parse_point)
            .map(Command::RemovePoint)
            .ok_or(CommandError::RemovePointUsage),
        _ => Err(CommandError::Unknown),
    }
}
