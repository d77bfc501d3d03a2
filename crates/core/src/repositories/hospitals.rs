//! Hospital directory.
//!
//! Supplies hospital identity and approval status. Registration and approval are external
//! workflows; `register` and `set_status` exist only so the directory can be seeded from the
//! CLI and tests.
//!
//! ## Storage Layout
//!
//! ```text
//! hospitals/
//!   <hospital_id>.yaml
//! ```

use crate::config::CoreConfig;
use crate::repositories::shared::{
    flat_yaml_files, flat_yaml_path, read_yaml, read_yaml_if_exists, write_yaml_atomic,
};
use crate::{RecordError, RecordResult};
use htr_types::{HospitalId, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Approval state of a hospital account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HospitalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::str::FromStr for HospitalStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(RecordError::InvalidInput(format!(
                "unknown hospital status '{}', expected pending, approved or rejected",
                other
            ))),
        }
    }
}

/// A hospital as held by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub hospital_id: HospitalId,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub hospital_name: NonEmptyText,
    #[serde(default)]
    pub status: HospitalStatus,
}

impl Hospital {
    pub fn identity(&self) -> HospitalIdentity {
        HospitalIdentity {
            hospital_id: self.hospital_id.clone(),
            hospital_name: self.hospital_name.clone(),
        }
    }
}

/// The authenticated hospital acting on a request: who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HospitalIdentity {
    pub hospital_id: HospitalId,
    pub hospital_name: NonEmptyText,
}

/// File-backed hospital directory.
#[derive(Clone, Debug)]
pub struct HospitalDirectory {
    cfg: Arc<CoreConfig>,
}

impl HospitalDirectory {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Stores a new hospital.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::HospitalAlreadyExists`] if the id is taken.
    pub fn register(&self, hospital: Hospital) -> RecordResult<Hospital> {
        let path = flat_yaml_path(&self.cfg.hospitals_dir(), hospital.hospital_id.as_str());
        if path.exists() {
            return Err(RecordError::HospitalAlreadyExists(
                hospital.hospital_id.to_string(),
            ));
        }
        write_yaml_atomic(&path, &hospital)?;
        tracing::info!(hospital_id = %hospital.hospital_id, "hospital registered");
        Ok(hospital)
    }

    /// Looks up a hospital by id.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::HospitalNotFound`] if the id is unknown.
    pub fn find(&self, hospital_id: &HospitalId) -> RecordResult<Hospital> {
        let path = flat_yaml_path(&self.cfg.hospitals_dir(), hospital_id.as_str());
        read_yaml_if_exists(&path)?.ok_or(RecordError::HospitalNotFound)
    }

    /// Changes the approval status of a registered hospital.
    pub fn set_status(
        &self,
        hospital_id: &HospitalId,
        status: HospitalStatus,
    ) -> RecordResult<Hospital> {
        let mut hospital = self.find(hospital_id)?;
        hospital.status = status;
        let path = flat_yaml_path(&self.cfg.hospitals_dir(), hospital_id.as_str());
        write_yaml_atomic(&path, &hospital)?;
        tracing::info!(hospital_id = %hospital_id, ?status, "hospital status changed");
        Ok(hospital)
    }

    /// Lists all hospitals ordered by id. Unparseable documents are skipped.
    pub fn list(&self) -> Vec<Hospital> {
        flat_yaml_files(&self.cfg.hospitals_dir())
            .into_iter()
            .filter_map(|path| match read_yaml::<Hospital>(&path) {
                Ok(hospital) => Some(hospital),
                Err(e) => {
                    tracing::warn!("failed to parse hospital file: {} - {}", path.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Resolves the hospital acting on a request.
    ///
    /// Only approved hospitals may act. Unknown and non-approved hospitals are refused with
    /// the same authorisation error.
    pub fn resolve_requester(&self, hospital_id: &HospitalId) -> RecordResult<HospitalIdentity> {
        match self.find(hospital_id) {
            Ok(hospital) if hospital.status == HospitalStatus::Approved => Ok(hospital.identity()),
            Ok(_) | Err(RecordError::HospitalNotFound) => Err(RecordError::HospitalNotApproved),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cfg(data_dir: &std::path::Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(data_dir.to_path_buf()).expect("CoreConfig::new should succeed"))
    }

    fn hospital(id: &str, status: HospitalStatus) -> Hospital {
        Hospital {
            hospital_id: HospitalId::parse(id).unwrap(),
            hospital_name: NonEmptyText::new(format!("Hospital {}", id)).unwrap(),
            status,
        }
    }

    #[test]
    fn test_register_and_find() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let directory = HospitalDirectory::new(test_cfg(temp_dir.path()));

        directory
            .register(hospital("H1", HospitalStatus::Pending))
            .unwrap();

        let found = directory.find(&HospitalId::parse("H1").unwrap()).unwrap();
        assert_eq!(found.status, HospitalStatus::Pending);
        assert!(matches!(
            directory.register(hospital("H1", HospitalStatus::Approved)),
            Err(RecordError::HospitalAlreadyExists(_))
        ));
    }

    #[test]
    fn test_resolve_requester_requires_approval() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let directory = HospitalDirectory::new(test_cfg(temp_dir.path()));
        let h1 = HospitalId::parse("H1").unwrap();

        directory
            .register(hospital("H1", HospitalStatus::Pending))
            .unwrap();
        assert!(matches!(
            directory.resolve_requester(&h1),
            Err(RecordError::HospitalNotApproved)
        ));

        directory.set_status(&h1, HospitalStatus::Approved).unwrap();
        let identity = directory.resolve_requester(&h1).unwrap();
        assert_eq!(identity.hospital_id, h1);
        assert_eq!(identity.hospital_name.as_str(), "Hospital H1");

        directory.set_status(&h1, HospitalStatus::Rejected).unwrap();
        assert!(directory.resolve_requester(&h1).is_err());
    }

    #[test]
    fn test_resolve_requester_unknown_hospital_is_forbidden() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let directory = HospitalDirectory::new(test_cfg(temp_dir.path()));

        let err = directory
            .resolve_requester(&HospitalId::parse("H9").unwrap())
            .unwrap_err();
        assert!(matches!(err, RecordError::HospitalNotApproved));
    }

    #[test]
    fn test_set_status_unknown_hospital() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let directory = HospitalDirectory::new(test_cfg(temp_dir.path()));

        let err = directory
            .set_status(&HospitalId::parse("H9").unwrap(), HospitalStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, RecordError::HospitalNotFound));
    }

    #[test]
    fn test_list_orders_by_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let directory = HospitalDirectory::new(test_cfg(temp_dir.path()));

        directory
            .register(hospital("H2", HospitalStatus::Approved))
            .unwrap();
        directory
            .register(hospital("H1", HospitalStatus::Rejected))
            .unwrap();

        let ids: Vec<_> = directory
            .list()
            .into_iter()
            .map(|h| h.hospital_id.to_string())
            .collect();
        assert_eq!(ids, vec!["H1", "H2"]);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "APPROVED".parse::<HospitalStatus>().unwrap(),
            HospitalStatus::Approved
        );
        assert!("maybe".parse::<HospitalStatus>().is_err());
    }
}
