//! Splice Common Utilities
//!
//! Shared infrastructure for all Splice crates:
//! - Error types and result aliases
//! - Export job identity
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod job;
pub mod logging;

pub use config::*;
pub use error::*;
pub use job::*;
