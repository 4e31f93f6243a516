//! Module `commands`
//!
//! Defines the two request commands a client can issue on the control
//! connection and how the raw command token maps onto them.

use std::fmt;

/// A command received from the client.
///
/// Only `l` and `g` are understood; anything else is kept verbatim so it
/// can be logged before the session replies with a command error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,         // "l": list regular files in the served directory
    Get,          // "g": fetch one file by exact name
    Invalid(String),
}

impl Command {
    /// Parses a command token. Matching is exact and case-sensitive.
    pub fn parse(raw: &str) -> Command {
        match raw {
            "l" => Command::List,
            "g" => Command::Get,
            other => Command::Invalid(other.to_string()),
        }
    }

    pub fn needs_data_channel(&self) -> bool {
        !matches!(self, Command::Invalid(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::List => write!(f, "LIST"),
            Command::Get => write!(f, "GET"),
            Command::Invalid(raw) => write!(f, "INVALID({:?})", raw),
        }
    }
}
