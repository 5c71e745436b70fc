//! sd-core: shared types, IDs, errors, and configuration.
//!
//! This crate is the foundational dependency for all other sd-* crates,
//! providing the school identifier, a unified error type, the validated
//! school field types, and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod school;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use school::*;
