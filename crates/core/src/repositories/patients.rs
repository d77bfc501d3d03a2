//! Patient directory.
//!
//! Canonical patient identity keyed by NIC. The treatment workflow only reads from it; the
//! `register` operation exists for seeding through the CLI and tests.
//!
//! ## Storage Layout
//!
//! ```text
//! patients/
//!   <nic>.yaml
//! ```

use crate::config::CoreConfig;
use crate::repositories::shared::{flat_yaml_files, flat_yaml_path, read_yaml, write_yaml_atomic};
use crate::{RecordError, RecordResult};
use chrono::NaiveDate;
use htr_types::{Nic, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub nic: Nic,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// File-backed patient directory.
#[derive(Clone, Debug)]
pub struct PatientDirectory {
    cfg: Arc<CoreConfig>,
}

impl PatientDirectory {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Stores a new patient.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::PatientAlreadyExists`] if the NIC is already registered, or a
    /// storage error if the document cannot be written.
    pub fn register(&self, patient: Patient) -> RecordResult<Patient> {
        let path = flat_yaml_path(&self.cfg.patients_dir(), patient.nic.as_str());
        if path.exists() {
            return Err(RecordError::PatientAlreadyExists(patient.nic.to_string()));
        }
        write_yaml_atomic(&path, &patient)?;
        tracing::info!(nic = %patient.nic, "patient registered");
        Ok(patient)
    }

    /// Looks up a patient by NIC.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::PatientNotFound`] when no patient has this NIC.
    pub fn find_by_nic(&self, nic: &Nic) -> RecordResult<Patient> {
        let path = flat_yaml_path(&self.cfg.patients_dir(), nic.as_str());
        if !path.is_file() {
            return Err(RecordError::PatientNotFound);
        }
        read_yaml(&path)
    }

    /// Lists all registered patients ordered by NIC.
    ///
    /// Documents that cannot be parsed are logged as warnings and skipped.
    pub fn list(&self) -> Vec<Patient> {
        flat_yaml_files(&self.cfg.patients_dir())
            .into_iter()
            .filter_map(|path| match read_yaml::<Patient>(&path) {
                Ok(patient) => Some(patient),
                Err(e) => {
                    tracing::warn!("failed to parse patient file: {} - {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}
