//! Transfer module
//!
//! Handles resolution of data endpoints, the outbound data channel, and
//! the payloads sent over it.

pub mod data_channel;
pub mod file_ops;
pub mod resolver;

// Re-export key types and functions
pub use data_channel::DataChannel;
pub use file_ops::{open_for_transfer, send_listing, stream_file};
pub use resolver::{DataTarget, parse_port, resolve_bind, resolve_peer};
