//! Shared repository utilities.
//!
//! This module contains the file system helpers used by every store:
//!
//! - **YAML documents**: atomic write (temporary sibling then rename) and typed read
//! - **Directory allocation**: collision-safe creation of sharded record directories
//! - **Directory walks**: enumeration of flat YAML directories and sharded record directories

use crate::constants::{RECORD_DIR_ALLOCATION_ATTEMPTS, YAML_EXTENSION};
use crate::{RecordError, RecordResult};
use htr_uuid::ShardableUuid;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Serialises `value` as YAML and writes it to `path` atomically.
///
/// The document is written to `<path>.tmp` and renamed over `path`, so readers see either the
/// previous document or the new one, never a partial write.
pub(crate) fn write_yaml_atomic<T: Serialize>(path: &Path, value: &T) -> RecordResult<()> {
    let yaml = serde_yaml::to_string(value).map_err(RecordError::YamlSerialization)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(RecordError::StorageDirCreation)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, yaml).map_err(RecordError::FileWrite)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(RecordError::FileWrite(e));
    }
    Ok(())
}

/// Reads and deserialises a YAML document.
pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> RecordResult<T> {
    let contents = fs::read_to_string(path).map_err(RecordError::FileRead)?;
    serde_yaml::from_str(&contents).map_err(RecordError::YamlDeserialization)
}

/// Reads a YAML document, returning `None` when the file does not exist.
pub(crate) fn read_yaml_if_exists<T: DeserializeOwned>(path: &Path) -> RecordResult<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_yaml(path).map(Some)
}

/// Returns the `<dir>/<stem>.yaml` path of a flat directory entry.
pub(crate) fn flat_yaml_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, YAML_EXTENSION))
}

/// Lists every `*.yaml` file directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub(crate) fn flat_yaml_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(_) => return files,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == YAML_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Creates a unique sharded directory within `base_dir`.
///
/// Generates UUIDs using `uuid_source` and attempts to create the corresponding sharded
/// directory, retrying with a fresh UUID when the candidate already exists.
///
/// # Errors
///
/// Returns [`RecordError::RecordDirCreation`] if:
/// - no free directory was found after [`RECORD_DIR_ALLOCATION_ATTEMPTS`] attempts,
/// - parent directory creation fails.
pub(crate) fn create_unique_shared_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> RecordResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..RECORD_DIR_ALLOCATION_ATTEMPTS {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(RecordError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RecordError::RecordDirCreation(e)),
        }
    }

    Err(RecordError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        format!(
            "failed to allocate a unique record directory after {} attempts",
            RECORD_DIR_ALLOCATION_ATTEMPTS
        ),
    )))
}

/// Enumerates the record directories of a sharded store: `<base>/<s1>/<s2>/<uuid>/`.
///
/// Entries whose final component is not a canonical UUID are skipped.
pub(crate) fn sharded_record_ids(base_dir: &Path) -> Vec<ShardableUuid> {
    let mut ids = Vec::new();

    let s1_iter = match fs::read_dir(base_dir) {
        Ok(it) => it,
        Err(_) => return ids,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for id_ent in id_iter.flatten() {
                if !id_ent.path().is_dir() {
                    continue;
                }
                let name = id_ent.file_name();
                match name.to_str().map(ShardableUuid::parse) {
                    Some(Ok(id)) => ids.push(id),
                    _ => tracing::warn!(
                        "skipping non-record directory: {}",
                        id_ent.path().display()
                    ),
                }
            }
        }
    }

    ids
}
