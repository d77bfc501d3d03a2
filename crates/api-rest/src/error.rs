//! Mapping of core errors and rejected request bodies onto HTTP responses.
//!
//! Every failure is answered with a `{"message": "..."}` body. Validation, not-found and
//! forbidden errors carry their user-facing message; internal failures are logged and
//! answered with a generic message.

use api_shared::MessageRes;
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use htr_core::{ErrorKind, RecordError};

/// A failure on its way out of a handler.
#[derive(Debug)]
pub enum ApiError {
    /// Raised by the core service.
    Record(RecordError),
    /// The request body could not be read or decoded.
    Body(JsonRejection),
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Record(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Transport => StatusCode::BAD_GATEWAY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Body(rejection) => match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Record(e) if e.kind() == ErrorKind::Internal => {
                tracing::error!("internal error: {:?}", e);
                "Internal error".to_string()
            }
            ApiError::Record(e) => e.to_string(),
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "Request body is too large".to_string()
            }
            ApiError::Body(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(MessageRes::new(self.message()))).into_response()
    }
}

/// JSON request body whose rejections are answered like every other [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_kind() {
        assert_eq!(
            ApiError::from(RecordError::MissingHospitalIdentity).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RecordError::PatientNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RecordError::NotOwner).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(RecordError::FileWrite(std::io::Error::other("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::from(RecordError::FileWrite(std::io::Error::other("disk full")));
        assert_eq!(err.message(), "Internal error");
    }
}
