//! Wire protocol
//!
//! Command tokens, control replies, bounded token I/O and data framing.

pub mod commands;
pub mod framing;
pub mod responses;
pub mod token;

pub use commands::Command;
pub use framing::Framing;
pub use responses::{Reply, Sentinel};
pub use token::{BUFFER_SIZE, Field, MAX_TOKEN_LEN, Token, read_token, write_token};
