//! Three-stage treatment intake.
//!
//! An [`IntakeAccumulator`] collects admission details, medical history and the treatment plan
//! for one patient, in that order, without persisting anything. Only [`IntakeAccumulator::commit`]
//! sends the assembled record, in a single call, through a [`TreatmentSubmitter`].
//!
//! ```text
//! Admission --record_admission--> MedicalHistory --record_medical_history--> TreatmentPlan
//!     ^                                |     ^                                   |
//!     +-------------back---------------+     +---------------back----------------+
//!
//! TreatmentPlan --record_treatment_plan + commit--> (reset to Admission)
//! ```
//!
//! Going back keeps everything already entered. [`IntakeAccumulator::discard`] drops it all.
//! A failed commit keeps the accumulated data so the caller can retry.

use crate::image::ImageBlob;
use crate::model::{Admission, MedicalHistory, TreatmentPlan, TreatmentRecord, TreatmentSubmission};
use crate::repositories::hospitals::HospitalIdentity;
use crate::treatment::TreatmentService;
use crate::validation::{
    ensure_admission_not_in_future, parse_admission_date, single_entry, split_comma_list,
};
use crate::{RecordError, RecordResult};
use chrono::NaiveDate;
use htr_types::Nic;
use std::fs;
use std::path::Path;

/// Sends a completed intake to wherever treatments are created.
pub trait TreatmentSubmitter {
    fn submit(
        &self,
        patient_nic: &Nic,
        submission: TreatmentSubmission,
    ) -> RecordResult<TreatmentRecord>;
}

impl TreatmentSubmitter for TreatmentService {
    fn submit(
        &self,
        patient_nic: &Nic,
        submission: TreatmentSubmission,
    ) -> RecordResult<TreatmentRecord> {
        self.create(patient_nic.as_str(), submission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Admission,
    MedicalHistory,
    TreatmentPlan,
}

impl IntakeStage {
    pub fn name(&self) -> &'static str {
        match self {
            IntakeStage::Admission => "admission",
            IntakeStage::MedicalHistory => "medical history",
            IntakeStage::TreatmentPlan => "treatment plan",
        }
    }
}

/// Stage 1 form input, as typed.
#[derive(Debug, Clone, Default)]
pub struct AdmissionForm {
    /// `YYYY-MM-DD`
    pub admission_date: String,
    pub admitting_physician: String,
    pub primary_diagnosis: String,
}

/// Stage 2 form input: one free-text field per list, plus image uploads.
#[derive(Debug, Clone, Default)]
pub struct MedicalHistoryForm {
    pub allergies: String,
    pub illnesses: String,
    pub medications: String,
    pub surgeries: String,
    pub immunizations: String,
    pub surgery_images: Vec<ImageAttachment>,
}

/// Stage 3 form input: comma-separated lists, plus image uploads.
#[derive(Debug, Clone, Default)]
pub struct TreatmentPlanForm {
    pub medications: String,
    pub lab_tests: String,
    pub therapies: String,
    pub lab_images: Vec<ImageAttachment>,
}

/// An uploaded file before it is embedded into the record.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub declared_media_type: Option<String>,
}

impl ImageAttachment {
    pub fn from_path(path: &Path) -> RecordResult<Self> {
        let bytes = fs::read(path).map_err(RecordError::FileRead)?;
        Ok(Self {
            bytes,
            declared_media_type: None,
        })
    }

    fn into_blob(self) -> RecordResult<ImageBlob> {
        ImageBlob::from_upload(self.bytes, self.declared_media_type.as_deref())
    }
}

fn embed(attachments: Vec<ImageAttachment>) -> RecordResult<Vec<ImageBlob>> {
    attachments.into_iter().map(ImageAttachment::into_blob).collect()
}

/// Client-held, in-memory state of one treatment intake.
#[derive(Debug, Clone)]
pub struct IntakeAccumulator {
    patient_nic: Nic,
    stage: IntakeStage,
    admission: Option<Admission>,
    medical_history: Option<MedicalHistory>,
    treatment_plan: Option<TreatmentPlan>,
}

impl IntakeAccumulator {
    pub fn new(patient_nic: Nic) -> Self {
        Self {
            patient_nic,
            stage: IntakeStage::Admission,
            admission: None,
            medical_history: None,
            treatment_plan: None,
        }
    }

    pub fn patient_nic(&self) -> &Nic {
        &self.patient_nic
    }

    pub fn stage(&self) -> IntakeStage {
        self.stage
    }

    pub fn admission(&self) -> Option<&Admission> {
        self.admission.as_ref()
    }

    pub fn medical_history(&self) -> Option<&MedicalHistory> {
        self.medical_history.as_ref()
    }

    pub fn treatment_plan(&self) -> Option<&TreatmentPlan> {
        self.treatment_plan.as_ref()
    }

    /// Stage 1. A future admission date is rejected and the stage does not advance.
    pub fn record_admission(&mut self, form: AdmissionForm, today: NaiveDate) -> RecordResult<()> {
        self.expect_stage(IntakeStage::Admission)?;

        let date = parse_admission_date(&form.admission_date)?;
        ensure_admission_not_in_future(date, today)?;

        self.admission = Some(Admission {
            date,
            physician: single_entry(&form.admitting_physician),
            primary_diagnosis: single_entry(&form.primary_diagnosis),
        });
        self.stage = IntakeStage::MedicalHistory;
        Ok(())
    }

    /// Stage 2. Attachments must be images; otherwise nothing is recorded.
    pub fn record_medical_history(&mut self, form: MedicalHistoryForm) -> RecordResult<()> {
        self.expect_stage(IntakeStage::MedicalHistory)?;

        self.medical_history = Some(MedicalHistory {
            allergies: single_entry(&form.allergies),
            illnesses: single_entry(&form.illnesses),
            medications: single_entry(&form.medications),
            surgeries: single_entry(&form.surgeries),
            immunizations: single_entry(&form.immunizations),
            surgery_images: embed(form.surgery_images)?,
        });
        self.stage = IntakeStage::TreatmentPlan;
        Ok(())
    }

    /// Stage 3. Comma-separated fields become ordered lists.
    pub fn record_treatment_plan(&mut self, form: TreatmentPlanForm) -> RecordResult<()> {
        self.expect_stage(IntakeStage::TreatmentPlan)?;

        self.treatment_plan = Some(TreatmentPlan {
            medications: split_comma_list(&form.medications),
            lab_tests: split_comma_list(&form.lab_tests),
            therapies: split_comma_list(&form.therapies),
            lab_images: embed(form.lab_images)?,
        });
        Ok(())
    }

    /// Steps back one stage, keeping all entered data. Returns the new stage.
    pub fn back(&mut self) -> IntakeStage {
        self.stage = match self.stage {
            IntakeStage::Admission | IntakeStage::MedicalHistory => IntakeStage::Admission,
            IntakeStage::TreatmentPlan => IntakeStage::MedicalHistory,
        };
        self.stage
    }

    /// Drops everything entered so far and returns to stage 1.
    pub fn discard(&mut self) {
        self.stage = IntakeStage::Admission;
        self.admission = None;
        self.medical_history = None;
        self.treatment_plan = None;
    }

    /// Submits the accumulated treatment on behalf of `session`.
    ///
    /// Refused locally, without calling `submitter`, when there is no hospital session or any
    /// section is missing. On success the accumulator is reset; on failure it is left as is.
    pub fn commit(
        &mut self,
        session: Option<&HospitalIdentity>,
        submitter: &impl TreatmentSubmitter,
    ) -> RecordResult<TreatmentRecord> {
        let session = session.ok_or(RecordError::HospitalSessionMissing)?;
        self.expect_stage(IntakeStage::TreatmentPlan)?;
        if let Some(section) = self.missing_section() {
            return Err(RecordError::MissingSection(section));
        }

        let submission = TreatmentSubmission {
            admission: self.admission.clone(),
            medical_history: self.medical_history.clone(),
            treatment_plan: self.treatment_plan.clone(),
            hospital_id: Some(session.hospital_id.to_string()),
            hospital_name: Some(session.hospital_name.to_string()),
        };

        match submitter.submit(&self.patient_nic, submission) {
            Ok(record) => {
                tracing::info!(treatment_id = %record.id, "intake committed");
                self.discard();
                Ok(record)
            }
            Err(e) => {
                tracing::warn!("intake commit failed, keeping entered data: {}", e);
                Err(e)
            }
        }
    }

    fn missing_section(&self) -> Option<&'static str> {
        if !self.admission.as_ref().is_some_and(Admission::is_complete) {
            return Some("admission");
        }
        if self.medical_history.as_ref().map_or(true, MedicalHistory::is_empty) {
            return Some("medicalHistory");
        }
        if self.treatment_plan.as_ref().map_or(true, TreatmentPlan::is_empty) {
            return Some("treatmentPlan");
        }
        None
    }

    fn expect_stage(&self, expected: IntakeStage) -> RecordResult<()> {
        if self.stage != expected {
            return Err(RecordError::StageOrder {
                current: self.stage.name(),
                expected: expected.name(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreatmentStatus;
    use chrono::Utc;
    use htr_types::{HospitalId, NonEmptyText};
    use htr_uuid::ShardableUuid;
    use std::cell::RefCell;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Records submissions and answers with a fixed outcome.
    struct RecordingSubmitter {
        fail_with_transport: bool,
        calls: RefCell<Vec<TreatmentSubmission>>,
    }

    impl RecordingSubmitter {
        fn new(fail_with_transport: bool) -> Self {
            Self {
                fail_with_transport,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl TreatmentSubmitter for RecordingSubmitter {
        fn submit(
            &self,
            patient_nic: &Nic,
            submission: TreatmentSubmission,
        ) -> RecordResult<TreatmentRecord> {
            self.calls.borrow_mut().push(submission.clone());
            if self.fail_with_transport {
                return Err(RecordError::Transport("connection refused".into()));
            }
            let now = Utc::now();
            Ok(TreatmentRecord {
                id: ShardableUuid::new(),
                patient_nic: patient_nic.clone(),
                hospital_id: HospitalId::parse(submission.hospital_id.unwrap()).unwrap(),
                hospital_name: NonEmptyText::new(submission.hospital_name.unwrap()).unwrap(),
                admission: submission.admission.unwrap(),
                medical_history: submission.medical_history.unwrap(),
                treatment_plan: submission.treatment_plan.unwrap(),
                status: TreatmentStatus::Active,
                created_at: now,
                updated_at: now,
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn session() -> HospitalIdentity {
        HospitalIdentity {
            hospital_id: HospitalId::parse("H1").unwrap(),
            hospital_name: NonEmptyText::new("General").unwrap(),
        }
    }

    fn admission_form(date: &str) -> AdmissionForm {
        AdmissionForm {
            admission_date: date.into(),
            admitting_physician: "Dr. A".into(),
            primary_diagnosis: "Flu".into(),
        }
    }

    fn filled_intake() -> IntakeAccumulator {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());
        intake
            .record_admission(admission_form("2024-05-09"), today())
            .unwrap();
        intake
            .record_medical_history(MedicalHistoryForm {
                allergies: "none".into(),
                ..Default::default()
            })
            .unwrap();
        intake
            .record_treatment_plan(TreatmentPlanForm {
                medications: "Paracetamol".into(),
                ..Default::default()
            })
            .unwrap();
        intake
    }

    #[test]
    fn test_stages_normalise_input() {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());

        intake
            .record_admission(admission_form("2024-05-09"), today())
            .unwrap();
        assert_eq!(intake.stage(), IntakeStage::MedicalHistory);
        let admission = intake.admission().unwrap();
        assert_eq!(admission.physician, vec!["Dr. A"]);
        assert_eq!(admission.primary_diagnosis, vec!["Flu"]);

        intake
            .record_medical_history(MedicalHistoryForm {
                allergies: " penicillin, dust ".into(),
                illnesses: "   ".into(),
                surgery_images: vec![ImageAttachment {
                    bytes: PNG_HEADER.to_vec(),
                    declared_media_type: None,
                }],
                ..Default::default()
            })
            .unwrap();
        let history = intake.medical_history().unwrap();
        assert_eq!(history.allergies, vec!["penicillin, dust"]);
        assert!(history.illnesses.is_empty());
        assert_eq!(history.surgery_images[0].media_type(), "image/png");

        intake
            .record_treatment_plan(TreatmentPlanForm {
                medications: "A, B,C ".into(),
                lab_tests: "CBC,".into(),
                ..Default::default()
            })
            .unwrap();
        let plan = intake.treatment_plan().unwrap();
        assert_eq!(plan.medications, vec!["A", "B", "C"]);
        assert_eq!(plan.lab_tests, vec!["CBC"]);
        assert!(plan.therapies.is_empty());
        assert_eq!(intake.stage(), IntakeStage::TreatmentPlan);
    }

    #[test]
    fn test_future_admission_date_blocks_advance() {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());

        let err = intake
            .record_admission(admission_form("2024-05-11"), today())
            .unwrap_err();

        assert!(matches!(err, RecordError::FutureAdmissionDate));
        assert_eq!(intake.stage(), IntakeStage::Admission);
        assert!(intake.admission().is_none());

        intake
            .record_admission(admission_form("2024-05-10"), today())
            .unwrap();
        assert_eq!(intake.stage(), IntakeStage::MedicalHistory);
    }

    #[test]
    fn test_stages_must_be_recorded_in_order() {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());

        let err = intake
            .record_treatment_plan(TreatmentPlanForm::default())
            .unwrap_err();
        assert!(matches!(err, RecordError::StageOrder { .. }));
    }

    #[test]
    fn test_non_image_attachment_is_rejected() {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());
        intake
            .record_admission(admission_form("2024-05-09"), today())
            .unwrap();

        let err = intake
            .record_medical_history(MedicalHistoryForm {
                allergies: "none".into(),
                surgery_images: vec![ImageAttachment {
                    bytes: b"%PDF-1.7".to_vec(),
                    declared_media_type: Some("application/pdf".into()),
                }],
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, RecordError::NotAnImage));
        assert_eq!(intake.stage(), IntakeStage::MedicalHistory);
        assert!(intake.medical_history().is_none());
    }

    #[test]
    fn test_back_keeps_entered_data() {
        let mut intake = filled_intake();

        assert_eq!(intake.back(), IntakeStage::MedicalHistory);
        assert_eq!(intake.back(), IntakeStage::Admission);
        assert_eq!(intake.back(), IntakeStage::Admission);

        assert!(intake.admission().is_some());
        assert!(intake.medical_history().is_some());
        assert!(intake.treatment_plan().is_some());
    }

    #[test]
    fn test_discard_drops_everything() {
        let mut intake = filled_intake();
        intake.discard();

        assert_eq!(intake.stage(), IntakeStage::Admission);
        assert!(intake.admission().is_none());
        assert!(intake.medical_history().is_none());
        assert!(intake.treatment_plan().is_none());
    }

    #[test]
    fn test_commit_without_session_is_refused_locally() {
        let mut intake = filled_intake();
        let submitter = RecordingSubmitter::new(false);

        let err = intake.commit(None, &submitter).unwrap_err();

        assert!(matches!(err, RecordError::HospitalSessionMissing));
        assert!(submitter.calls.borrow().is_empty());
        assert_eq!(intake.stage(), IntakeStage::TreatmentPlan);
    }

    #[test]
    fn test_commit_with_empty_section_is_refused_locally() {
        let mut intake = IntakeAccumulator::new(Nic::parse("NIC123").unwrap());
        intake
            .record_admission(admission_form("2024-05-09"), today())
            .unwrap();
        intake
            .record_medical_history(MedicalHistoryForm::default())
            .unwrap();
        intake
            .record_treatment_plan(TreatmentPlanForm {
                medications: "Paracetamol".into(),
                ..Default::default()
            })
            .unwrap();
        let submitter = RecordingSubmitter::new(false);

        let err = intake.commit(Some(&session()), &submitter).unwrap_err();

        assert!(matches!(err, RecordError::MissingSection("medicalHistory")));
        assert!(submitter.calls.borrow().is_empty());
    }

    #[test]
    fn test_commit_success_resets() {
        let mut intake = filled_intake();
        let submitter = RecordingSubmitter::new(false);

        let record = intake.commit(Some(&session()), &submitter).unwrap();

        assert_eq!(record.hospital_id.as_str(), "H1");
        assert_eq!(record.treatment_plan.medications, vec!["Paracetamol"]);
        assert_eq!(submitter.calls.borrow().len(), 1);
        assert_eq!(
            submitter.calls.borrow()[0].hospital_name.as_deref(),
            Some("General")
        );
        assert_eq!(intake.stage(), IntakeStage::Admission);
        assert!(intake.admission().is_none());
    }

    #[test]
    fn test_commit_failure_keeps_data() {
        let mut intake = filled_intake();
        let submitter = RecordingSubmitter::new(true);

        let err = intake.commit(Some(&session()), &submitter).unwrap_err();

        assert!(matches!(err, RecordError::Transport(_)));
        assert_eq!(intake.stage(), IntakeStage::TreatmentPlan);
        assert_eq!(
            intake.treatment_plan().unwrap().medications,
            vec!["Paracetamol"]
        );
    }
}
