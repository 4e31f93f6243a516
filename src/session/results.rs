//! Session result types
//!
//! What a completed session did, for logging and tests.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Listing sent; `entries` is the number of names framed
    Listed { entries: usize },
    /// File relayed in full
    FileSent { name: String, bytes: u64 },
    /// Requested name did not match a regular file; no data connection made
    FileNotFound { name: String },
    /// Unrecognised command token; no data connection made
    InvalidCommand { token: String },
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Listed { entries } => write!(f, "listed {} entries", entries),
            SessionOutcome::FileSent { name, bytes } => write!(f, "sent {} ({} bytes)", name, bytes),
            SessionOutcome::FileNotFound { name } => write!(f, "file {:?} not found", name),
            SessionOutcome::InvalidCommand { token } => write!(f, "invalid command {:?}", token),
        }
    }
}
