//! Treatment record lifecycle.
//!
//! [`TreatmentService`] is the single entry point used by the REST API, the CLI and the intake
//! accumulator. It validates input, resolves the requesting hospital, applies the ownership
//! gate and only then calls into the [`TreatmentStore`].
//!
//! ## Pure Data Operations
//!
//! This module contains **only** data operations. Transport concerns (HTTP status codes,
//! headers, JSON bodies) belong in `api-rest` and `api-shared`.

use crate::config::CoreConfig;
use crate::gate::OwnershipGate;
use crate::model::{TreatmentPatch, TreatmentRecord, TreatmentSubmission};
use crate::repositories::hospitals::{HospitalDirectory, HospitalIdentity};
use crate::repositories::patients::PatientDirectory;
use crate::repositories::treatments::{NewTreatment, TreatmentStore};
use crate::stats::{TreatmentCounts, TreatmentStats};
use crate::validation::ensure_admission_not_in_future;
use crate::{RecordError, RecordResult};
use chrono::{Local, NaiveDate};
use htr_types::{HospitalId, Nic, NonEmptyText};
use htr_uuid::ShardableUuid;
use std::sync::Arc;

/// Validates and executes treatment operations.
#[derive(Clone, Debug)]
pub struct TreatmentService {
    patients: PatientDirectory,
    hospitals: HospitalDirectory,
    store: TreatmentStore,
}

impl TreatmentService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            patients: PatientDirectory::new(cfg.clone()),
            hospitals: HospitalDirectory::new(cfg.clone()),
            store: TreatmentStore::new(cfg),
        }
    }

    pub fn patients(&self) -> &PatientDirectory {
        &self.patients
    }

    pub fn hospitals(&self) -> &HospitalDirectory {
        &self.hospitals
    }

    /// Creates a treatment record for the patient with `patient_nic`.
    ///
    /// Checks run in this order, and the first failure is returned:
    /// 1. hospital id and name are present ([`RecordError::MissingHospitalIdentity`])
    /// 2. all three sections are present and non-empty ([`RecordError::MissingSection`])
    /// 3. the admission date is not in the future ([`RecordError::FutureAdmissionDate`])
    /// 4. the hospital is registered and approved ([`RecordError::HospitalNotApproved`])
    /// 5. the patient exists ([`RecordError::PatientNotFound`])
    ///
    /// Nothing is written unless every check passes.
    pub fn create(
        &self,
        patient_nic: &str,
        submission: TreatmentSubmission,
    ) -> RecordResult<TreatmentRecord> {
        let TreatmentSubmission {
            admission,
            medical_history,
            treatment_plan,
            hospital_id,
            hospital_name,
        } = submission;

        let (hospital_id, hospital_name) = match (non_blank(hospital_id), non_blank(hospital_name))
        {
            (Some(id), Some(name)) => (HospitalId::parse(id)?, NonEmptyText::new(name)?),
            _ => return Err(RecordError::MissingHospitalIdentity),
        };
        let patient_nic = Nic::parse(patient_nic)?;

        let admission = admission
            .filter(|a| a.is_complete())
            .ok_or(RecordError::MissingSection("admission"))?;
        let medical_history = medical_history
            .filter(|h| !h.is_empty())
            .ok_or(RecordError::MissingSection("medicalHistory"))?;
        let treatment_plan = treatment_plan
            .filter(|p| !p.is_empty())
            .ok_or(RecordError::MissingSection("treatmentPlan"))?;

        ensure_admission_not_in_future(admission.date, today())?;

        self.hospitals.resolve_requester(&hospital_id)?;
        self.patients.find_by_nic(&patient_nic)?;

        self.store.insert(NewTreatment {
            patient_nic,
            hospital_id,
            hospital_name,
            admission,
            medical_history,
            treatment_plan,
        })
    }

    /// Lists a patient's treatments in creation order, optionally only those of one hospital.
    ///
    /// # Errors
    ///
    /// An empty result is an error: [`RecordError::NoTreatmentsForHospital`] when a filter was
    /// given, [`RecordError::NoTreatments`] otherwise.
    pub fn list_by_patient(
        &self,
        patient_nic: &str,
        hospital_id: Option<&str>,
    ) -> RecordResult<Vec<TreatmentRecord>> {
        let patient_nic = Nic::parse(patient_nic)?;
        let filter = parse_filter(hospital_id)?;

        let mut records = self.store.find(|s| s.patient_nic == patient_nic)?;
        match filter {
            Some(hospital_id) => {
                OwnershipGate::retain_owned(&mut records, &hospital_id);
                if records.is_empty() {
                    return Err(RecordError::NoTreatmentsForHospital);
                }
            }
            None if records.is_empty() => return Err(RecordError::NoTreatments),
            None => {}
        }
        Ok(records)
    }

    /// Lists every treatment in creation order, optionally only one hospital's.
    pub fn list_all(&self, hospital_id: Option<&str>) -> RecordResult<Vec<TreatmentRecord>> {
        match parse_filter(hospital_id)? {
            Some(hospital_id) => self.store.find(|s| s.hospital_id == hospital_id),
            None => self.store.find(|_| true),
        }
    }

    /// Applies a partial update on behalf of `requester_id`.
    ///
    /// The record must match both `treatment_id` and `patient_nic`. Ownership is checked
    /// before the merge, and the merged record must still satisfy the create-time rules. An
    /// empty patch returns the stored record without rewriting it.
    pub fn update(
        &self,
        patient_nic: &str,
        treatment_id: &str,
        requester_id: &str,
        patch: TreatmentPatch,
    ) -> RecordResult<TreatmentRecord> {
        let requester = self.requester(requester_id)?;
        let patient_nic = Nic::parse(patient_nic)?;
        let treatment_id = ShardableUuid::parse(treatment_id)?;

        let mut record = self.load_for_patient(&patient_nic, &treatment_id)?;
        OwnershipGate::ensure(&record, &requester)?;
        if patch.is_empty() {
            return Ok(record);
        }

        record.apply_patch(patch);
        validate_record(&record)?;
        self.store.replace(record)
    }

    /// Permanently deletes one treatment on behalf of `requester_id`.
    pub fn delete_by_id(
        &self,
        patient_nic: &str,
        treatment_id: &str,
        requester_id: &str,
    ) -> RecordResult<ShardableUuid> {
        let requester = self.requester(requester_id)?;
        let patient_nic = Nic::parse(patient_nic)?;
        let treatment_id = ShardableUuid::parse(treatment_id)?;

        let record = self.load_for_patient(&patient_nic, &treatment_id)?;
        OwnershipGate::ensure(&record, &requester)?;

        self.store.remove(&record.id)?;
        Ok(record.id)
    }

    /// Deletes the earliest treatment of `patient_nic` created by the requesting hospital.
    ///
    /// # Errors
    ///
    /// [`RecordError::NoTreatmentForNic`] when the patient has no treatments at all;
    /// [`RecordError::NotOwner`] when treatments exist but none belongs to the requester.
    pub fn delete_by_nic(
        &self,
        patient_nic: &str,
        requester_id: &str,
    ) -> RecordResult<ShardableUuid> {
        let requester = self.requester(requester_id)?;
        let patient_nic = Nic::parse(patient_nic)?;

        let summaries: Vec<_> = self
            .store
            .summaries()?
            .into_iter()
            .filter(|s| s.patient_nic == patient_nic)
            .collect();
        if summaries.is_empty() {
            return Err(RecordError::NoTreatmentForNic);
        }

        let target = summaries
            .iter()
            .find(|s| OwnershipGate::authorized(*s, &requester))
            .ok_or(RecordError::NotOwner)?;

        self.store.remove(&target.id)?;
        Ok(target.id.clone())
    }

    /// Dashboard statistics for one hospital's records.
    pub fn stats(&self, hospital_id: &str) -> RecordResult<TreatmentStats> {
        let hospital_id = HospitalId::parse(hospital_id)?;
        let mut summaries = self.store.summaries()?;
        OwnershipGate::retain_owned(&mut summaries, &hospital_id);
        Ok(TreatmentStats::from_summaries(&summaries))
    }

    /// Patient and active-treatment counters for one hospital.
    pub fn counts(&self, hospital_id: &str) -> RecordResult<TreatmentCounts> {
        let hospital_id = HospitalId::parse(hospital_id)?;
        let mut summaries = self.store.summaries()?;
        OwnershipGate::retain_owned(&mut summaries, &hospital_id);
        Ok(TreatmentCounts::from_summaries(&summaries))
    }

    /// Resolves the hospital acting on a mutation.
    ///
    /// A blank id is a missing session; unknown and unapproved hospitals are refused.
    pub fn requester(&self, requester_id: &str) -> RecordResult<HospitalIdentity> {
        if requester_id.trim().is_empty() {
            return Err(RecordError::HospitalSessionMissing);
        }
        let hospital_id = HospitalId::parse(requester_id)?;
        self.hospitals.resolve_requester(&hospital_id)
    }

    fn load_for_patient(
        &self,
        patient_nic: &Nic,
        treatment_id: &ShardableUuid,
    ) -> RecordResult<TreatmentRecord> {
        let record = self.store.get(treatment_id)?;
        if &record.patient_nic != patient_nic {
            return Err(RecordError::TreatmentNotFound);
        }
        Ok(record)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_filter(hospital_id: Option<&str>) -> RecordResult<Option<HospitalId>> {
    hospital_id
        .filter(|id| !id.trim().is_empty())
        .map(HospitalId::parse)
        .transpose()
        .map_err(RecordError::from)
}

fn validate_record(record: &TreatmentRecord) -> RecordResult<()> {
    if !record.admission.is_complete() {
        return Err(RecordError::MissingSection("admission"));
    }
    if record.medical_history.is_empty() {
        return Err(RecordError::MissingSection("medicalHistory"));
    }
    if record.treatment_plan.is_empty() {
        return Err(RecordError::MissingSection("treatmentPlan"));
    }
    ensure_admission_not_in_future(record.admission.date, today())
}
