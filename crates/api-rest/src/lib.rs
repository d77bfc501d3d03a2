//! # API REST
//!
//! REST API implementation for HTR.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation served at `/api-docs/openapi.json`
//! - REST-specific concerns (JSON bodies, status codes, CORS, body size limit)
//!
//! Uses `api-shared` for common types and utilities. All record semantics live in
//! [`htr_core::TreatmentService`].

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{delete, get, put},
    Router,
};
use htr_core::TreatmentService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub use error::{ApiError, ApiJson};

/// Default listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default request body limit. Treatment submissions carry images as data URLs.
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TreatmentService>,
}

impl AppState {
    pub fn new(service: TreatmentService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// REST server settings resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
}

impl RestConfig {
    /// Build the settings from optional environment values.
    ///
    /// Blank values fall back to [`DEFAULT_REST_ADDR`] and [`DEFAULT_MAX_BODY_BYTES`].
    pub fn from_env_values(
        addr: Option<String>,
        max_body_bytes: Option<String>,
    ) -> anyhow::Result<Self> {
        let addr = non_blank(addr).unwrap_or_else(|| DEFAULT_REST_ADDR.to_string());
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr:?}: {e}"))?;

        let max_body_bytes = match non_blank(max_body_bytes) {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid body size limit {v:?}: {e}"))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            addr,
            max_body_bytes,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_patients,
        handlers::find_patient,
        handlers::create_treatment,
        handlers::list_treatments,
        handlers::update_treatment,
        handlers::delete_treatment,
        handlers::delete_treatment_by_nic,
        handlers::list_all_treatments,
        handlers::treatment_stats,
        handlers::treatment_counts,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::MessageRes,
        api_shared::TreatmentCreatedRes,
        api_shared::TreatmentUpdatedRes,
        api_shared::AllTreatmentsRes,
        htr_core::Patient,
        htr_core::Admission,
        htr_core::MedicalHistory,
        htr_core::TreatmentPlan,
        htr_core::TreatmentStatus,
        htr_core::TreatmentRecord,
        htr_core::TreatmentSubmission,
        htr_core::AdmissionPatch,
        htr_core::MedicalHistoryPatch,
        htr_core::TreatmentPlanPatch,
        htr_core::TreatmentPatch,
        htr_core::TreatmentStats,
        htr_core::TreatmentCounts,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the HTTP router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/patient", get(handlers::list_patients))
        .route("/patient/search/:nic", get(handlers::find_patient))
        .route("/api/treatments/all", get(handlers::list_all_treatments))
        .route("/api/treatments/:nic", delete(handlers::delete_treatment_by_nic))
        .route(
            "/api/treatment/stats/:hospital_id",
            get(handlers::treatment_stats),
        )
        .route(
            "/api/treatment/count/:hospital_id",
            get(handlers::treatment_counts),
        )
        .route(
            "/api/treatment/:nic",
            get(handlers::list_treatments).post(handlers::create_treatment),
        )
        .route(
            "/api/treatment/:nic/:treatment_id",
            put(handlers::update_treatment).delete(handlers::delete_treatment),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `cfg.addr` and serve until the process is stopped.
pub async fn serve(state: AppState, cfg: &RestConfig) -> anyhow::Result<()> {
    let app = router(state, cfg.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    tracing::info!("-- HTR REST API listening on {}", cfg.addr);
    axum::serve(listener, app).await?;
    Ok(())
}
