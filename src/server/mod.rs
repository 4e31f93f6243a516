//! Server core functionality
//!
//! This module contains the listener and its configuration.

pub mod config;
pub mod core;

pub use self::config::{ServerConfig, SessionSettings};
pub use self::core::{Server, handle_connection};
