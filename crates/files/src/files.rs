//! Record-scoped file storage service implementation
//!
//! [`FilesService`] stores and retrieves the binary attachments of a single treatment
//! record. Semantic data (the treatment document) only ever holds references
//! ([`FileMetadata`]); the bytes live under the record's `files/` folder.
//!
//! # Content Addressing
//!
//! Files are stored using their SHA-256 hash as the identifier. This provides:
//!
//! - **Deduplication**: Identical images attached twice are stored once
//! - **Integrity**: File content is verified against its hash on read
//! - **Immutability**: Files cannot be modified after creation
//!
//! # Implementation Notes
//!
//! - The constructor validates that the record directory exists; nothing is created there
//! - Writes go to a temporary sibling and are renamed into place
//! - The service implements `Debug` but not `Clone` (single-owner semantics)

use crate::constants::HASH_ALGORITHM;
use crate::{FilesError, FILES_FOLDER_NAME};
use chrono::{DateTime, Utc};
use htr_types::NonEmptyText;
use htr_uuid::{Sha256Hash, ShardableUuid};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata for a stored file
///
/// Serialised into the treatment document in place of the image bytes. It carries no
/// patient or clinical identifiers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the record root where the file is stored
    pub relative_path: NonEmptyText,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// Best-effort detection from the leading bytes; `None` when unrecognised.
    pub media_type: Option<NonEmptyText>,

    /// UTC timestamp when the file was stored
    pub stored_at: DateTime<Utc>,
}

/// Service for managing files within one record directory
#[derive(Debug)]
pub struct FilesService {
    /// Root directory containing all record directories
    root_directory: PathBuf,

    /// Record identifier
    repository_id: ShardableUuid,
}

impl FilesService {
    /// Creates a new `FilesService` for a specific record
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The root directory does not exist or is not a directory
    /// - The record directory does not exist or is not a directory
    pub fn new(root_directory: &Path, repository_id: ShardableUuid) -> Result<Self, FilesError> {
        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        let repository_root = repository_id.sharded_dir(root_directory);
        if !repository_root.is_dir() {
            return Err(FilesError::RepositoryNotFound(format!(
                "Repository directory does not exist: {}",
                repository_root.display()
            )));
        }

        Ok(Self {
            root_directory: root_directory.to_path_buf(),
            repository_id,
        })
    }

    /// Adds bytes to the record's content-addressed storage
    ///
    /// Adding content that is already stored is not an error: the existing file is kept
    /// and its metadata returned.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the storage directory or file cannot be written.
    pub fn add_bytes(&self, bytes: &[u8]) -> Result<FileMetadata, FilesError> {
        let hash = hash_bytes(bytes);
        let storage_path = self.compute_storage_path(&hash);

        if !storage_path.exists() {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = storage_path.with_extension("tmp");
            fs::write(&tmp_path, bytes)?;
            fs::rename(&tmp_path, &storage_path)?;
        }

        let media_type = infer::get(bytes).map(|kind| text(kind.mime_type()));

        Ok(FileMetadata {
            hash_algorithm: text(HASH_ALGORITHM),
            relative_path: text(&self.compute_relative_path(&hash)),
            hash,
            size_bytes: bytes.len() as u64,
            media_type,
            stored_at: Utc::now(),
        })
    }

    /// Retrieves a file from content-addressed storage by its hash
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - No file is stored under `hash`
    /// - The file cannot be read (I/O)
    /// - The stored bytes no longer match `hash`
    pub fn read(&self, hash: &Sha256Hash) -> Result<Vec<u8>, FilesError> {
        let storage_path = self.compute_storage_path(hash);
        if !storage_path.is_file() {
            return Err(FilesError::FileNotFound(hash.to_string()));
        }

        let bytes = fs::read(&storage_path)?;
        if &hash_bytes(&bytes) != hash {
            return Err(FilesError::IntegrityMismatch(hash.to_string()));
        }
        Ok(bytes)
    }

    /// Absolute path: `<record_root>/files/sha256/<shard1>/<shard2>/<hash>`
    fn compute_storage_path(&self, hash: &Sha256Hash) -> PathBuf {
        self.repository_root().join(self.compute_relative_path(hash))
    }

    fn compute_relative_path(&self, hash: &Sha256Hash) -> String {
        let hex = hash.as_str();
        format!(
            "{}/{}/{}/{}/{}",
            FILES_FOLDER_NAME,
            HASH_ALGORITHM,
            &hex[0..2],
            &hex[2..4],
            hex
        )
    }

    fn repository_root(&self) -> PathBuf {
        self.repository_id.sharded_dir(&self.root_directory)
    }
}

fn hash_bytes(bytes: &[u8]) -> Sha256Hash {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    Sha256Hash::from_bytes(&digest)
}

fn text(value: &str) -> NonEmptyText {
    NonEmptyText::new(value).expect("literal and computed paths are non-empty")
}
