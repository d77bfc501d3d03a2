//! # HTR Core
//!
//! Core business logic for the HTR hospital treatment record system.
//!
//! This crate contains pure data operations and file/folder management:
//! - Patient and hospital directories stored as flat YAML files under `HTR_DATA_DIR`
//! - Treatment records in a sharded directory layout, with images stored content-addressed
//! - The hospital ownership gate applied before every update and delete
//! - The three-stage intake accumulator and its submission seam
//!
//! **No API concerns**: HTTP servers, header parsing and status codes belong in `api-rest`
//! or `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod gate;
pub mod image;
pub mod intake;
pub mod model;
pub mod repositories;
pub mod stats;
pub mod treatment;
pub mod validation;

pub use config::{data_dir_from_env_value, CoreConfig};
pub use error::{ErrorKind, RecordError, RecordResult};
pub use gate::OwnershipGate;
pub use image::ImageBlob;
pub use intake::{
    AdmissionForm, ImageAttachment, IntakeAccumulator, IntakeStage, MedicalHistoryForm,
    TreatmentPlanForm, TreatmentSubmitter,
};
pub use model::{
    Admission, AdmissionPatch, MedicalHistory, MedicalHistoryPatch, TreatmentPatch,
    TreatmentPlan, TreatmentPlanPatch, TreatmentRecord, TreatmentStatus, TreatmentSubmission,
};
pub use repositories::hospitals::{Hospital, HospitalDirectory, HospitalIdentity, HospitalStatus};
pub use repositories::patients::{Patient, PatientDirectory};
pub use repositories::treatments::{NewTreatment, TreatmentStore, TreatmentSummary};
pub use stats::{TreatmentCounts, TreatmentStats};
pub use treatment::TreatmentService;

pub use htr_types::{HospitalId, Nic, NonEmptyText, TextError};
pub use htr_uuid::ShardableUuid;
