//! Per-hospital treatment statistics.
//!
//! Derived on every call from record summaries; nothing is cached or stored.

use crate::model::TreatmentStatus;
use crate::repositories::treatments::TreatmentSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TreatmentStats {
    /// Distinct patients with at least one record.
    pub total_patients: usize,
    /// Records whose plan lists at least one medication.
    pub active_treatments: usize,
    /// Records without any lab image yet.
    pub pending_reports: usize,
    /// Records explicitly marked completed.
    pub completed_treatments: usize,
}

impl TreatmentStats {
    /// Computes statistics over the given summaries (already scoped to one hospital).
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a TreatmentSummary>) -> Self {
        let mut patients = HashSet::new();
        let mut stats = Self::default();

        for summary in summaries {
            patients.insert(&summary.patient_nic);
            if summary.has_medications {
                stats.active_treatments += 1;
            }
            if summary.lab_image_count == 0 {
                stats.pending_reports += 1;
            }
            if summary.status == TreatmentStatus::Completed {
                stats.completed_treatments += 1;
            }
        }

        stats.total_patients = patients.len();
        stats
    }
}

/// Headline counters for a hospital dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TreatmentCounts {
    pub unique_patients: usize,
    /// Records whose explicit status is still active.
    pub active_treatments: usize,
}

impl TreatmentCounts {
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a TreatmentSummary>) -> Self {
        let mut patients = HashSet::new();
        let mut active_treatments = 0;
        for summary in summaries {
            patients.insert(&summary.patient_nic);
            if summary.status == TreatmentStatus::Active {
                active_treatments += 1;
            }
        }
        Self {
            unique_patients: patients.len(),
            active_treatments,
        }
    }
}
