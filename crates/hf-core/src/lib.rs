//! hf-core: shared types, IDs, errors, and configuration.
//!
//! This crate is the foundational dependency for all other hf-* crates,
//! providing the unified error type, the rendition data model with its
//! default ladder, typed session identifiers, and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
