//! # API Shared
//!
//! Shared utilities and definitions for HTR APIs.
//!
//! Contains:
//! - Request/response body types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Requester identification from request headers
//!
//! Used by `api-rest` and by the CLI's HTTP submitter, so both sides of the wire agree on the
//! JSON shapes.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{requester_from_header, HOSPITAL_ID_HEADER};
pub use dto::{
    AllTreatmentsRes, HealthRes, MessageRes, TreatmentCreatedRes, TreatmentUpdatedRes,
};
pub use health::HealthService;
