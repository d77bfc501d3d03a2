//! Hospital ownership checks.
//!
//! A treatment record belongs to the hospital that created it, for its whole lifetime. Every
//! update and delete passes through [`OwnershipGate::ensure`] before the store is touched, and
//! "my hospital" views use [`OwnershipGate::retain_owned`] as a filter.
//!
//! A failed check is reported as [`RecordError::NotOwner`], which never names the owning
//! hospital.

use crate::model::TreatmentRecord;
use crate::repositories::hospitals::HospitalIdentity;
use crate::repositories::treatments::TreatmentSummary;
use crate::{RecordError, RecordResult};
use htr_types::HospitalId;

/// Anything stamped with the hospital that owns it.
pub trait Owned {
    fn owner(&self) -> &HospitalId;
}

impl Owned for TreatmentRecord {
    fn owner(&self) -> &HospitalId {
        &self.hospital_id
    }
}

impl Owned for TreatmentSummary {
    fn owner(&self) -> &HospitalId {
        &self.hospital_id
    }
}

pub struct OwnershipGate;

impl OwnershipGate {
    /// True when `requester` is the hospital that created `record`.
    pub fn authorized(record: &impl Owned, requester: &HospitalIdentity) -> bool {
        record.owner() == &requester.hospital_id
    }

    /// Fails with [`RecordError::NotOwner`] unless `requester` owns `record`.
    pub fn ensure(record: &impl Owned, requester: &HospitalIdentity) -> RecordResult<()> {
        if Self::authorized(record, requester) {
            Ok(())
        } else {
            tracing::warn!(
                requester = %requester.hospital_id,
                "rejected access to a treatment owned by another hospital"
            );
            Err(RecordError::NotOwner)
        }
    }

    /// Keeps only the records owned by `hospital_id`.
    pub fn retain_owned<T: Owned>(records: &mut Vec<T>, hospital_id: &HospitalId) {
        records.retain(|record| record.owner() == hospital_id);
    }
}
