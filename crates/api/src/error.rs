use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use brokerlink_core::RelayError;

/// A [`RelayError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RelayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RelayError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::AlreadyExists(_) => StatusCode::CONFLICT,
            RelayError::StillProcessing => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Upstream { .. } | RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(kind = self.0.kind(), error = %self.0, "Operation failed");
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
