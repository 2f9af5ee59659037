//! # pagemeta-core
//!
//! Core types, traits, and abstractions for pagemeta.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other pagemeta crates depend on.
//!
//! ## Structured logging fields
//!
//! All crates log through `tracing` using the same field names so that log
//! aggregation can query across subsystems: `subsystem` ("api", "db",
//! "jobs", "uploads"), `component`, `op`, `job_id`, `url`, `batch_path`,
//! `duration_ms`, `error`.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::sanitize_filename;
pub use models::*;
pub use traits::*;
