//! File system storage
//!
//! Handles enumeration of the served directory.

pub mod catalog;

pub use catalog::{DirectoryCatalog, list_regular_files};
