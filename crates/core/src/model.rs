//! Treatment record data model.
//!
//! All wire-facing types serialise as camelCase JSON. A [`TreatmentRecord`] is the persisted
//! episode; [`TreatmentSubmission`] is the unvalidated create payload and [`TreatmentPatch`]
//! the partial update payload.

use crate::image::ImageBlob;
use crate::validation::is_blank_list;
use chrono::{DateTime, NaiveDate, Utc};
use htr_types::{HospitalId, Nic, NonEmptyText};
use htr_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

/// Stage 1 of intake: when and why the patient was admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub date: NaiveDate,
    #[serde(default)]
    pub physician: Vec<String>,
    #[serde(default)]
    pub primary_diagnosis: Vec<String>,
}

impl Admission {
    /// An admission is usable once both the physician and the diagnosis are filled in.
    pub fn is_complete(&self) -> bool {
        !is_blank_list(&self.physician) && !is_blank_list(&self.primary_diagnosis)
    }
}

/// Stage 2 of intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalHistory {
    pub allergies: Vec<String>,
    pub illnesses: Vec<String>,
    pub medications: Vec<String>,
    pub surgeries: Vec<String>,
    pub immunizations: Vec<String>,
    /// Images as `data:` URLs.
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub surgery_images: Vec<ImageBlob>,
}

impl MedicalHistory {
    pub fn is_empty(&self) -> bool {
        is_blank_list(&self.allergies)
            && is_blank_list(&self.illnesses)
            && is_blank_list(&self.medications)
            && is_blank_list(&self.surgeries)
            && is_blank_list(&self.immunizations)
            && self.surgery_images.is_empty()
    }
}

/// Stage 3 of intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct TreatmentPlan {
    pub medications: Vec<String>,
    pub lab_tests: Vec<String>,
    pub therapies: Vec<String>,
    /// Images as `data:` URLs.
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub lab_images: Vec<ImageBlob>,
}

impl TreatmentPlan {
    pub fn is_empty(&self) -> bool {
        is_blank_list(&self.medications)
            && is_blank_list(&self.lab_tests)
            && is_blank_list(&self.therapies)
            && self.lab_images.is_empty()
    }
}

/// Explicit clinical status of a treatment episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TreatmentStatus {
    #[default]
    Active,
    Completed,
}

impl std::str::FromStr for TreatmentStatus {
    type Err = crate::RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(crate::RecordError::InvalidInput(format!(
                "unknown treatment status '{}', expected active or completed",
                other
            ))),
        }
    }
}

/// One hospital's treatment episode for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRecord {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: ShardableUuid,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub patient_nic: Nic,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub hospital_id: HospitalId,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub hospital_name: NonEmptyText,
    pub admission: Admission,
    pub medical_history: MedicalHistory,
    pub treatment_plan: TreatmentPlan,
    #[serde(default)]
    pub status: TreatmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload as received from a client, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TreatmentSubmission {
    pub admission: Option<Admission>,
    pub medical_history: Option<MedicalHistory>,
    pub treatment_plan: Option<TreatmentPlan>,
    pub hospital_id: Option<String>,
    pub hospital_name: Option<String>,
}

/// Partial admission update: only supplied fields replace stored ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionPatch {
    pub date: Option<NaiveDate>,
    pub physician: Option<Vec<String>>,
    pub primary_diagnosis: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalHistoryPatch {
    pub allergies: Option<Vec<String>>,
    pub illnesses: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub surgeries: Option<Vec<String>>,
    pub immunizations: Option<Vec<String>>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<String>>))]
    pub surgery_images: Option<Vec<ImageBlob>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct TreatmentPlanPatch {
    pub medications: Option<Vec<String>>,
    pub lab_tests: Option<Vec<String>>,
    pub therapies: Option<Vec<String>>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<String>>))]
    pub lab_images: Option<Vec<ImageBlob>>,
}

/// Partial update of a treatment record.
///
/// The ownership stamp and patient reference are not part of the patch; unknown JSON fields
/// (such as `hospitalId`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct TreatmentPatch {
    pub admission: Option<AdmissionPatch>,
    pub medical_history: Option<MedicalHistoryPatch>,
    pub treatment_plan: Option<TreatmentPlanPatch>,
    pub status: Option<TreatmentStatus>,
}

impl TreatmentPatch {
    pub fn is_empty(&self) -> bool {
        self.admission.is_none()
            && self.medical_history.is_none()
            && self.treatment_plan.is_none()
            && self.status.is_none()
    }
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl TreatmentRecord {
    /// Field-level merge of `patch` into this record. Does not touch `updated_at`.
    pub fn apply_patch(&mut self, patch: TreatmentPatch) {
        if let Some(admission) = patch.admission {
            merge(&mut self.admission.date, admission.date);
            merge(&mut self.admission.physician, admission.physician);
            merge(
                &mut self.admission.primary_diagnosis,
                admission.primary_diagnosis,
            );
        }
        if let Some(history) = patch.medical_history {
            let target = &mut self.medical_history;
            merge(&mut target.allergies, history.allergies);
            merge(&mut target.illnesses, history.illnesses);
            merge(&mut target.medications, history.medications);
            merge(&mut target.surgeries, history.surgeries);
            merge(&mut target.immunizations, history.immunizations);
            merge(&mut target.surgery_images, history.surgery_images);
        }
        if let Some(plan) = patch.treatment_plan {
            let target = &mut self.treatment_plan;
            merge(&mut target.medications, plan.medications);
            merge(&mut target.lab_tests, plan.lab_tests);
            merge(&mut target.therapies, plan.therapies);
            merge(&mut target.lab_images, plan.lab_images);
        }
        merge(&mut self.status, patch.status);
    }
}
