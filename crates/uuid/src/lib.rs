//! Identifier and sharded-path utilities.
//!
//! HTR stores each treatment record under a sharded directory derived from its UUID, and
//! each attached image under a sharded directory derived from its SHA-256 digest.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Canonical form is *required* for externally supplied identifiers (path parameters, CLI
//! arguments). Use [`ShardableUuid::parse`] to validate an input string.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, records live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `htr_data/treatments/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::{Sha256Hash, ShardableUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
