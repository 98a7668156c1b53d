//! HTTP error type shared by all handlers.
//!
//! Pipeline internals use `anyhow`; an [`ApiError`] embedded anywhere in the
//! chain propagates its exact status and detail, everything else maps to 500
//! with its string representation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// An error that already knows its HTTP status.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Status-tagged errors pass through unchanged
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_error_keeps_its_status() {
        let err: anyhow::Error = ApiError::unprocessable("no pages rendered").into();
        let api = ApiError::from(err);

        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.detail, "no pages rendered");
    }

    #[test]
    fn untagged_error_becomes_500() {
        let err = anyhow::anyhow!("sidecar connection refused");
        let api = ApiError::from(err);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.detail, "sidecar connection refused");
    }

    #[tokio::test]
    async fn response_body_carries_detail() {
        let response = ApiError::bad_request("No file uploaded").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "No file uploaded");
    }
}
