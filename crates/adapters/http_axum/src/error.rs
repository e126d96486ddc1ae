//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use pinhub_domain::error::{HubError, ResourceError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(HubError::Validation(err))
    }
}

fn resource_status(err: &ResourceError) -> StatusCode {
    match err {
        ResourceError::PinUnavailable { .. } | ResourceError::NotInitialized { .. } => {
            StatusCode::CONFLICT
        }
        ResourceError::InvalidPin { .. } => StatusCode::BAD_REQUEST,
        ResourceError::Acquisition { .. }
        | ResourceError::Fault { .. }
        | ResourceError::Cleanup(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            HubError::Resource(err) => {
                let status = resource_status(err);
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::warn!(error = %err, "output failure");
                }
                (status, err.to_string())
            }
            HubError::Load(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            HubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
