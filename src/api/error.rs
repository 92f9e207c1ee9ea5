//! HTTP rendering of [`AppError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::AppError;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CountryNotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(messages) => json!({
                "error": self.code(),
                "messages": messages,
            }),
            AppError::Upstream(e) => {
                error!(error = %e, "Upstream provider failed");
                json!({
                    "error": self.code(),
                    "message": "An upstream data provider failed",
                })
            }
            _ => json!({
                "error": self.code(),
                "message": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
