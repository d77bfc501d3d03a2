//! HTTP handlers.
//!
//! Handlers only translate between HTTP and [`TreatmentService`]: path/query/header
//! extraction on the way in, status codes and JSON bodies on the way out.

use crate::error::{ApiError, ApiJson};
use crate::AppState;
use api_shared::{
    requester_from_header, AllTreatmentsRes, HealthRes, HealthService, MessageRes,
    TreatmentCreatedRes, TreatmentUpdatedRes, HOSPITAL_ID_HEADER,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use htr_core::{
    Nic, Patient, TreatmentCounts, TreatmentPatch, TreatmentRecord, TreatmentStats,
    TreatmentSubmission,
};
use serde::Deserialize;

/// Optional `?hospitalId=` filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct HospitalFilter {
    /// Only return treatments added by this hospital.
    pub hospital_id: Option<String>,
}

fn requester(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers.get(HOSPITAL_ID_HEADER).map(|v| v.as_bytes());
    Ok(requester_from_header(value)?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patient",
    responses(
        (status = 200, description = "All registered patients", body = [Patient])
    )
)]
#[axum::debug_handler]
pub async fn list_patients(State(state): State<AppState>) -> Json<Vec<Patient>> {
    Json(state.service.patients().list())
}

#[utoipa::path(
    get,
    path = "/patient/search/{nic}",
    params(("nic" = String, Path, description = "National identity card number")),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 400, description = "Malformed NIC", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn find_patient(
    State(state): State<AppState>,
    Path(nic): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let nic = Nic::parse(&nic).map_err(htr_core::RecordError::from)?;
    Ok(Json(state.service.patients().find_by_nic(&nic)?))
}

#[utoipa::path(
    post,
    path = "/api/treatment/{nic}",
    params(("nic" = String, Path, description = "Patient NIC")),
    request_body = TreatmentSubmission,
    responses(
        (status = 201, description = "Treatment created", body = TreatmentCreatedRes),
        (status = 400, description = "Malformed body, missing hospital information, missing section or future admission date", body = MessageRes),
        (status = 403, description = "Hospital not approved", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes),
        (status = 413, description = "Request body exceeds the configured limit", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Create a treatment record from a completed three-stage intake
#[axum::debug_handler]
pub async fn create_treatment(
    State(state): State<AppState>,
    Path(nic): Path<String>,
    ApiJson(submission): ApiJson<TreatmentSubmission>,
) -> Result<(StatusCode, Json<TreatmentCreatedRes>), ApiError> {
    let treatment = state.service.create(&nic, submission)?;
    Ok((
        StatusCode::CREATED,
        Json(TreatmentCreatedRes {
            message: "Treatment added successfully".into(),
            treatment,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/treatment/{nic}",
    params(("nic" = String, Path, description = "Patient NIC"), HospitalFilter),
    responses(
        (status = 200, description = "Treatments in creation order", body = [TreatmentRecord]),
        (status = 404, description = "No treatments (message depends on the filter)", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_treatments(
    State(state): State<AppState>,
    Path(nic): Path<String>,
    Query(filter): Query<HospitalFilter>,
) -> Result<Json<Vec<TreatmentRecord>>, ApiError> {
    let records = state
        .service
        .list_by_patient(&nic, filter.hospital_id.as_deref())?;
    Ok(Json(records))
}

#[utoipa::path(
    put,
    path = "/api/treatment/{nic}/{treatment_id}",
    params(
        ("nic" = String, Path, description = "Patient NIC"),
        ("treatment_id" = String, Path, description = "Treatment id"),
        ("x-hospital-id" = String, Header, description = "Requesting hospital")
    ),
    request_body = TreatmentPatch,
    responses(
        (status = 200, description = "Treatment updated", body = TreatmentUpdatedRes),
        (status = 400, description = "Malformed body, missing hospital information or invalid update", body = MessageRes),
        (status = 403, description = "Treatment belongs to another hospital", body = MessageRes),
        (status = 404, description = "Treatment not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn update_treatment(
    State(state): State<AppState>,
    Path((nic, treatment_id)): Path<(String, String)>,
    headers: HeaderMap,
    ApiJson(patch): ApiJson<TreatmentPatch>,
) -> Result<Json<TreatmentUpdatedRes>, ApiError> {
    let requester = requester(&headers)?;
    let treatment = state
        .service
        .update(&nic, &treatment_id, &requester, patch)?;
    Ok(Json(TreatmentUpdatedRes {
        message: "Treatment updated successfully".into(),
        treatment,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/treatment/{nic}/{treatment_id}",
    params(
        ("nic" = String, Path, description = "Patient NIC"),
        ("treatment_id" = String, Path, description = "Treatment id"),
        ("x-hospital-id" = String, Header, description = "Requesting hospital")
    ),
    responses(
        (status = 200, description = "Treatment deleted", body = MessageRes),
        (status = 403, description = "Treatment belongs to another hospital", body = MessageRes),
        (status = 404, description = "Treatment not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_treatment(
    State(state): State<AppState>,
    Path((nic, treatment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<MessageRes>, ApiError> {
    let requester = requester(&headers)?;
    state.service.delete_by_id(&nic, &treatment_id, &requester)?;
    Ok(Json(MessageRes::new("Treatment deleted successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/treatments/{nic}",
    params(
        ("nic" = String, Path, description = "Patient NIC"),
        ("x-hospital-id" = String, Header, description = "Requesting hospital")
    ),
    responses(
        (status = 200, description = "Earliest treatment of the requesting hospital deleted", body = MessageRes),
        (status = 403, description = "No treatment of this patient belongs to the requesting hospital", body = MessageRes),
        (status = 404, description = "Patient has no treatments", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_treatment_by_nic(
    State(state): State<AppState>,
    Path(nic): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageRes>, ApiError> {
    let requester = requester(&headers)?;
    state.service.delete_by_nic(&nic, &requester)?;
    Ok(Json(MessageRes::new("Treatment deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/treatments/all",
    params(HospitalFilter),
    responses(
        (status = 200, description = "All treatments", body = AllTreatmentsRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_all_treatments(
    State(state): State<AppState>,
    Query(filter): Query<HospitalFilter>,
) -> Result<Json<AllTreatmentsRes>, ApiError> {
    let data = state.service.list_all(filter.hospital_id.as_deref())?;
    Ok(Json(AllTreatmentsRes { data }))
}

#[utoipa::path(
    get,
    path = "/api/treatment/stats/{hospital_id}",
    params(("hospital_id" = String, Path, description = "Hospital id")),
    responses(
        (status = 200, description = "Dashboard statistics", body = TreatmentStats),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn treatment_stats(
    State(state): State<AppState>,
    Path(hospital_id): Path<String>,
) -> Result<Json<TreatmentStats>, ApiError> {
    Ok(Json(state.service.stats(&hospital_id)?))
}

#[utoipa::path(
    get,
    path = "/api/treatment/count/{hospital_id}",
    params(("hospital_id" = String, Path, description = "Hospital id")),
    responses(
        (status = 200, description = "Patient and active treatment counters", body = TreatmentCounts),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn treatment_counts(
    State(state): State<AppState>,
    Path(hospital_id): Path<String>,
) -> Result<Json<TreatmentCounts>, ApiError> {
    Ok(Json(state.service.counts(&hospital_id)?))
}
