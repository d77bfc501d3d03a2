//! Treatment record store.
//!
//! One document per treatment episode, permanently tagged with the authoring hospital.
//!
//! ## Storage Layout
//!
//! ```text
//! treatments/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         treatment.yaml                      # record document
//!         files/sha256/<h1>/<h2>/<hash>       # attached images
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the record UUID. Image bytes are
//! kept out of the document: `treatment.yaml` holds [`FileMetadata`] references and the store
//! rehydrates them into [`ImageBlob`]s on read.
//!
//! This module is pure storage. Ownership checks happen in [`crate::gate`] before any
//! mutating call reaches the store.

use crate::config::CoreConfig;
use crate::constants::TREATMENT_YAML_FILENAME;
use crate::image::ImageBlob;
use crate::model::{Admission, MedicalHistory, TreatmentPlan, TreatmentRecord, TreatmentStatus};
use crate::repositories::shared::{
    create_unique_shared_dir, read_yaml, sharded_record_ids, write_yaml_atomic,
};
use crate::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use htr_files::{FileMetadata, FilesService, FILES_FOLDER_NAME};
use htr_types::{HospitalId, Nic, NonEmptyText};
use htr_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated treatment ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreatment {
    pub patient_nic: Nic,
    pub hospital_id: HospitalId,
    pub hospital_name: NonEmptyText,
    pub admission: Admission,
    pub medical_history: MedicalHistory,
    pub treatment_plan: TreatmentPlan,
}

/// Lightweight view of a stored record, read without loading any image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentSummary {
    pub id: ShardableUuid,
    pub patient_nic: Nic,
    pub hospital_id: HospitalId,
    pub status: TreatmentStatus,
    pub has_medications: bool,
    pub lab_image_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredImage {
    media_type: String,
    file: FileMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMedicalHistory {
    allergies: Vec<String>,
    illnesses: Vec<String>,
    medications: Vec<String>,
    surgeries: Vec<String>,
    immunizations: Vec<String>,
    surgery_images: Vec<StoredImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTreatmentPlan {
    medications: Vec<String>,
    lab_tests: Vec<String>,
    therapies: Vec<String>,
    lab_images: Vec<StoredImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTreatment {
    id: ShardableUuid,
    patient_nic: Nic,
    hospital_id: HospitalId,
    hospital_name: NonEmptyText,
    admission: Admission,
    medical_history: StoredMedicalHistory,
    treatment_plan: StoredTreatmentPlan,
    #[serde(default)]
    status: TreatmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredTreatment {
    fn summary(&self) -> TreatmentSummary {
        TreatmentSummary {
            id: self.id.clone(),
            patient_nic: self.patient_nic.clone(),
            hospital_id: self.hospital_id.clone(),
            status: self.status,
            has_medications: self
                .treatment_plan
                .medications
                .iter()
                .any(|m| !m.trim().is_empty()),
            lab_image_count: self.treatment_plan.lab_images.len(),
            created_at: self.created_at,
        }
    }

    fn images(&self) -> impl Iterator<Item = &StoredImage> {
        self.medical_history
            .surgery_images
            .iter()
            .chain(self.treatment_plan.lab_images.iter())
    }
}

/// File-backed treatment record store.
#[derive(Clone, Debug)]
pub struct TreatmentStore {
    cfg: Arc<CoreConfig>,
}

impl TreatmentStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Persists a new treatment record and returns it with its assigned id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `RecordError` if the record directory cannot be allocated or any image or the
    /// document cannot be written. On failure the partially-created record directory is
    /// removed; if that cleanup also fails, [`RecordError::CleanupAfterCreateFailed`] carries
    /// both errors.
    pub fn insert(&self, new: NewTreatment) -> RecordResult<TreatmentRecord> {
        let treatments_dir = self.cfg.treatments_dir();
        fs::create_dir_all(&treatments_dir).map_err(RecordError::StorageDirCreation)?;

        let (id, record_dir) = create_unique_shared_dir(&treatments_dir, ShardableUuid::new)?;
        let now = Utc::now();
        let record = TreatmentRecord {
            id: id.clone(),
            patient_nic: new.patient_nic,
            hospital_id: new.hospital_id,
            hospital_name: new.hospital_name,
            admission: new.admission,
            medical_history: new.medical_history,
            treatment_plan: new.treatment_plan,
            status: TreatmentStatus::Active,
            created_at: now,
            updated_at: now,
        };

        match self.write_record(&record_dir, &record) {
            Ok(_) => {
                tracing::info!(
                    treatment_id = %id,
                    hospital_id = %record.hospital_id,
                    "treatment record created"
                );
                Ok(record)
            }
            Err(create_error) => match fs::remove_dir_all(&record_dir) {
                Ok(()) => Err(create_error),
                Err(cleanup_error) => Err(RecordError::CleanupAfterCreateFailed {
                    path: record_dir,
                    create_error: Box::new(create_error),
                    cleanup_error,
                }),
            },
        }
    }

    /// Loads a record with its images.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TreatmentNotFound`] if no record has this id.
    pub fn get(&self, id: &ShardableUuid) -> RecordResult<TreatmentRecord> {
        let stored = self.read_stored(id)?;
        self.hydrate(stored)
    }

    /// Overwrites an existing record and returns it with a fresh `updated_at`.
    ///
    /// Images no longer referenced by the record are removed from its directory.
    pub fn replace(&self, mut record: TreatmentRecord) -> RecordResult<TreatmentRecord> {
        let record_dir = self.record_dir(&record.id);
        if !record_dir.join(TREATMENT_YAML_FILENAME).is_file() {
            return Err(RecordError::TreatmentNotFound);
        }

        record.updated_at = Utc::now();
        let stored = self.write_record(&record_dir, &record)?;

        let referenced: HashSet<PathBuf> = stored
            .images()
            .map(|image| record_dir.join(image.file.relative_path.as_str()))
            .collect();
        prune_unreferenced_files(&record_dir.join(FILES_FOLDER_NAME), &referenced);

        tracing::info!(treatment_id = %record.id, "treatment record updated");
        Ok(record)
    }

    /// Permanently removes a record and all of its images.
    pub fn remove(&self, id: &ShardableUuid) -> RecordResult<()> {
        let record_dir = self.record_dir(id);
        if !record_dir.is_dir() {
            return Err(RecordError::TreatmentNotFound);
        }
        fs::remove_dir_all(&record_dir).map_err(RecordError::FileDelete)?;

        // Empty shard directories are left behind by other records too; drop them when possible.
        let mut parent = record_dir.parent();
        for _ in 0..2 {
            match parent {
                Some(dir) if fs::remove_dir(dir).is_ok() => parent = dir.parent(),
                _ => break,
            }
        }

        tracing::info!(treatment_id = %id, "treatment record deleted");
        Ok(())
    }

    /// Summaries of every record, in creation order.
    ///
    /// # Errors
    ///
    /// Fails if any record document cannot be read or parsed, so a damaged record is never
    /// silently left out of listings or statistics.
    pub fn summaries(&self) -> RecordResult<Vec<TreatmentSummary>> {
        let mut summaries: Vec<_> = self
            .stored_all()?
            .iter()
            .map(StoredTreatment::summary)
            .collect();
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(summaries)
    }

    /// Loads, in creation order, every record whose summary matches `predicate`.
    ///
    /// Image bytes are only read for matching records.
    pub fn find(
        &self,
        predicate: impl Fn(&TreatmentSummary) -> bool,
    ) -> RecordResult<Vec<TreatmentRecord>> {
        let mut matching: Vec<StoredTreatment> = self
            .stored_all()?
            .into_iter()
            .filter(|stored| predicate(&stored.summary()))
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        matching
            .into_iter()
            .map(|stored| self.hydrate(stored))
            .collect()
    }

    fn record_dir(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.cfg.treatments_dir())
    }

    fn read_stored(&self, id: &ShardableUuid) -> RecordResult<StoredTreatment> {
        let path = self.record_dir(id).join(TREATMENT_YAML_FILENAME);
        if !path.is_file() {
            return Err(RecordError::TreatmentNotFound);
        }
        read_yaml(&path)
    }

    fn stored_all(&self) -> RecordResult<Vec<StoredTreatment>> {
        let mut all = Vec::new();
        for id in sharded_record_ids(&self.cfg.treatments_dir()) {
            match self.read_stored(&id) {
                Ok(stored) if stored.id == id => all.push(stored),
                Ok(stored) => tracing::warn!(
                    "treatment document id {} does not match its directory {}",
                    stored.id,
                    id
                ),
                // A directory without a document is a create still in progress.
                Err(RecordError::TreatmentNotFound) => {}
                Err(e) => {
                    tracing::error!("failed to read treatment record {}: {}", id, e);
                    return Err(e);
                }
            }
        }
        Ok(all)
    }

    /// Stores the record's images and writes the document. Returns what was written.
    fn write_record(
        &self,
        record_dir: &Path,
        record: &TreatmentRecord,
    ) -> RecordResult<StoredTreatment> {
        let files = FilesService::new(&self.cfg.treatments_dir(), record.id.clone())?;
        let store_images = |images: &[ImageBlob]| -> RecordResult<Vec<StoredImage>> {
            images
                .iter()
                .map(|image| -> RecordResult<StoredImage> {
                    Ok(StoredImage {
                        media_type: image.media_type().to_owned(),
                        file: files.add_bytes(image.bytes())?,
                    })
                })
                .collect()
        };

        let history = &record.medical_history;
        let plan = &record.treatment_plan;
        let stored = StoredTreatment {
            id: record.id.clone(),
            patient_nic: record.patient_nic.clone(),
            hospital_id: record.hospital_id.clone(),
            hospital_name: record.hospital_name.clone(),
            admission: record.admission.clone(),
            medical_history: StoredMedicalHistory {
                allergies: history.allergies.clone(),
                illnesses: history.illnesses.clone(),
                medications: history.medications.clone(),
                surgeries: history.surgeries.clone(),
                immunizations: history.immunizations.clone(),
                surgery_images: store_images(&history.surgery_images)?,
            },
            treatment_plan: StoredTreatmentPlan {
                medications: plan.medications.clone(),
                lab_tests: plan.lab_tests.clone(),
                therapies: plan.therapies.clone(),
                lab_images: store_images(&plan.lab_images)?,
            },
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };

        write_yaml_atomic(&record_dir.join(TREATMENT_YAML_FILENAME), &stored)?;
        Ok(stored)
    }

    fn hydrate(&self, stored: StoredTreatment) -> RecordResult<TreatmentRecord> {
        let files = FilesService::new(&self.cfg.treatments_dir(), stored.id.clone())?;
        let load_images = |images: Vec<StoredImage>| -> RecordResult<Vec<ImageBlob>> {
            images
                .into_iter()
                .map(|image| ImageBlob::new(image.media_type, files.read(&image.file.hash)?))
                .collect()
        };

        let history = stored.medical_history;
        let plan = stored.treatment_plan;
        Ok(TreatmentRecord {
            id: stored.id,
            patient_nic: stored.patient_nic,
            hospital_id: stored.hospital_id,
            hospital_name: stored.hospital_name,
            admission: stored.admission,
            medical_history: MedicalHistory {
                allergies: history.allergies,
                illnesses: history.illnesses,
                medications: history.medications,
                surgeries: history.surgeries,
                immunizations: history.immunizations,
                surgery_images: load_images(history.surgery_images)?,
            },
            treatment_plan: TreatmentPlan {
                medications: plan.medications,
                lab_tests: plan.lab_tests,
                therapies: plan.therapies,
                lab_images: load_images(plan.lab_images)?,
            },
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }
}

/// Removes every file under `dir` that is not in `referenced`.
///
/// Failures are logged; a leftover image never invalidates the record.
fn prune_unreferenced_files(dir: &Path, referenced: &HashSet<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            prune_unreferenced_files(&path, referenced);
            let _ = fs::remove_dir(&path);
        } else if !referenced.contains(&path) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("failed to prune image {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF";

    fn test_cfg(data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(data_dir.to_path_buf()).expect("CoreConfig::new should succeed"))
    }

    fn new_treatment(nic: &str, hospital: &str) -> NewTreatment {
        NewTreatment {
            patient_nic: Nic::parse(nic).unwrap(),
            hospital_id: HospitalId::parse(hospital).unwrap(),
            hospital_name: NonEmptyText::new(format!("Hospital {}", hospital)).unwrap(),
            admission: Admission {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                physician: vec!["Dr. A".into()],
                primary_diagnosis: vec!["Flu".into()],
            },
            medical_history: MedicalHistory {
                allergies: vec!["none".into()],
                surgery_images: vec![ImageBlob::new("image/png", PNG_HEADER.to_vec()).unwrap()],
                ..Default::default()
            },
            treatment_plan: TreatmentPlan {
                medications: vec!["Paracetamol".into()],
                ..Default::default()
            },
        }
    }

    fn count_files(dir: &Path) -> usize {
        let mut count = 0;
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    count += count_files(&path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_insert_then_get_round_trips_images() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        let created = store.insert(new_treatment("NIC123", "H1")).unwrap();
        let loaded = store.get(&created.id).unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.medical_history.surgery_images[0].bytes(), PNG_HEADER);
        assert_eq!(loaded.status, TreatmentStatus::Active);

        let record_dir = created.id.sharded_dir(&temp_dir.path().join("treatments"));
        assert!(record_dir.join("treatment.yaml").is_file());
        assert_eq!(count_files(&record_dir.join("files")), 1);

        let yaml = fs::read_to_string(record_dir.join("treatment.yaml")).unwrap();
        assert!(!yaml.contains("base64"), "document must hold references only");
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        let err = store.get(&ShardableUuid::new()).unwrap_err();
        assert!(matches!(err, RecordError::TreatmentNotFound));
    }

    #[test]
    fn test_replace_updates_document_and_prunes_images() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        let mut record = store.insert(new_treatment("NIC123", "H1")).unwrap();
        record.medical_history.surgery_images =
            vec![ImageBlob::new("image/jpeg", JPEG_HEADER.to_vec()).unwrap()];
        record.treatment_plan.therapies = vec!["Rest".into()];

        let updated = store.replace(record.clone()).unwrap();
        assert!(updated.updated_at >= updated.created_at);

        let loaded = store.get(&record.id).unwrap();
        assert_eq!(loaded.treatment_plan.therapies, vec!["Rest"]);
        assert_eq!(loaded.medical_history.surgery_images[0].bytes(), JPEG_HEADER);

        let record_dir = record.id.sharded_dir(&temp_dir.path().join("treatments"));
        assert_eq!(count_files(&record_dir.join("files")), 1);
    }

    #[test]
    fn test_remove_deletes_record_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        let record = store.insert(new_treatment("NIC123", "H1")).unwrap();
        store.remove(&record.id).unwrap();

        assert!(matches!(
            store.get(&record.id),
            Err(RecordError::TreatmentNotFound)
        ));
        assert!(!record
            .id
            .sharded_dir(&temp_dir.path().join("treatments"))
            .exists());
        assert!(matches!(
            store.remove(&record.id),
            Err(RecordError::TreatmentNotFound)
        ));
    }

    #[test]
    fn test_find_filters_and_orders_by_creation() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        let first = store.insert(new_treatment("NIC123", "H1")).unwrap();
        let _other = store.insert(new_treatment("NIC999", "H1")).unwrap();
        let second = store.insert(new_treatment("NIC123", "H2")).unwrap();

        let nic = Nic::parse("NIC123").unwrap();
        let found = store.find(|s| s.patient_nic == nic).unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        assert_eq!(store.summaries().unwrap().len(), 3);
    }

    #[test]
    fn test_summaries_skip_records_still_being_created() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        store.insert(new_treatment("NIC123", "H1")).unwrap();
        let pending = ShardableUuid::new();
        fs::create_dir_all(pending.sharded_dir(&temp_dir.path().join("treatments"))).unwrap();

        let summaries = store.summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].has_medications);
        assert_eq!(summaries[0].lab_image_count, 0);
    }

    #[test]
    fn test_unreadable_document_fails_listings() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreatmentStore::new(test_cfg(temp_dir.path()));

        store.insert(new_treatment("NIC123", "H1")).unwrap();
        let broken = ShardableUuid::new();
        let broken_dir = broken.sharded_dir(&temp_dir.path().join("treatments"));
        fs::create_dir_all(&broken_dir).unwrap();
        fs::write(broken_dir.join("treatment.yaml"), "{{ not yaml").unwrap();

        let err = store.summaries().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Internal);
        assert!(store.find(|_| true).is_err());
    }
}
