//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{
    DEFAULT_DATA_DIR, HOSPITALS_DIR_NAME, PATIENTS_DIR_NAME, TREATMENTS_DIR_NAME,
};
use crate::{RecordError, RecordResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The data directory is created if it does not exist yet. A path that exists but is not a
    /// directory is rejected.
    pub fn new(data_dir: PathBuf) -> RecordResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(RecordError::InvalidInput(
                "data directory cannot be empty".into(),
            ));
        }
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(RecordError::InvalidInput(format!(
                "data directory is not a directory: {}",
                data_dir.display()
            )));
        }
        fs::create_dir_all(&data_dir).map_err(RecordError::StorageDirCreation)?;

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn hospitals_dir(&self) -> PathBuf {
        self.data_dir.join(HOSPITALS_DIR_NAME)
    }

    pub fn treatments_dir(&self) -> PathBuf {
        self.data_dir.join(TREATMENTS_DIR_NAME)
    }
}

/// Resolve the data directory from an optional environment value.
///
/// Blank values fall back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_missing_data_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("nested").join("htr");

        let cfg = CoreConfig::new(data_dir.clone()).expect("CoreConfig::new should succeed");

        assert!(data_dir.is_dir());
        assert_eq!(cfg.patients_dir(), data_dir.join("patients"));
        assert_eq!(cfg.hospitals_dir(), data_dir.join("hospitals"));
        assert_eq!(cfg.treatments_dir(), data_dir.join("treatments"));
    }

    #[test]
    fn test_new_rejects_file_as_data_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let err = CoreConfig::new(file).unwrap_err();
        assert!(matches!(err, RecordError::InvalidInput(_)));
    }

    #[test]
    fn test_data_dir_from_env_value_defaults_when_blank() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from("htr_data"));
        assert_eq!(
            data_dir_from_env_value(Some("   ".into())),
            PathBuf::from("htr_data")
        );
        assert_eq!(
            data_dir_from_env_value(Some(" /srv/htr ".into())),
            PathBuf::from("/srv/htr")
        );
    }
}
