//! Error handling
//!
//! Defines error types and handling for the file server.

pub mod handlers;
pub mod types;

pub use handlers::{handle_session_error, is_client_fault};
pub use types::*;
