//! HTR file storage
//!
//! Binary attachments (surgery and lab images) are stored outside the treatment document,
//! content-addressed by SHA-256 inside the owning record's directory:
//!
//! ```text
//! treatments/<s1>/<s2>/<record_id>/
//! ├── treatment.yaml
//! └── files/
//!     └── sha256/
//!         └── ab/
//!             └── 3f/
//!                 └── ab3f9e…
//! ```
//!
//! - Files are immutable once added; identical content is stored once.
//! - Storage is scoped to a single record, so removing the record directory removes its
//!   images with it.
//!
//! ## Example Usage
//!
//! ```no_run
//! use htr_files::FilesService;
//! use htr_uuid::ShardableUuid;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new("htr_data/treatments");
//! let record_id = ShardableUuid::parse("550e8400e29b41d4a716446655440000")?;
//!
//! let service = FilesService::new(root, record_id)?;
//! let meta = service.add_bytes(b"\x89PNG\r\n\x1a\n")?;
//! let bytes = service.read(&meta.hash)?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::FILES_FOLDER_NAME;
pub use files::{FileMetadata, FilesService};
pub use htr_uuid::{Sha256Hash, ShardableUuid};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Record directory does not exist
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    /// No stored file has the requested hash
    #[error("File not found for hash: {0}")]
    FileNotFound(String),

    /// Stored bytes no longer hash to their address
    #[error("Stored file {0} failed integrity check")]
    IntegrityMismatch(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identifier error from htr-uuid crate
    #[error("UUID error: {0}")]
    Uuid(#[from] htr_uuid::UuidError),
}
