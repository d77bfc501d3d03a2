//! JSON bodies exchanged with HTR clients.

use htr_core::TreatmentRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Plain confirmation or error body: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentCreatedRes {
    pub message: String,
    pub treatment: TreatmentRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentUpdatedRes {
    pub message: String,
    pub treatment: TreatmentRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllTreatmentsRes {
    pub data: Vec<TreatmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_shape() {
        let json = serde_json::to_value(MessageRes::new("Treatment deleted successfully")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Treatment deleted successfully"}));
    }
}
