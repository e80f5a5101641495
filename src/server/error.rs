//! Error types for the HTTP layer

use crate::feature_mapper::FeatureError;
use crate::models::InferenceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid request body: {message}")]
    InvalidPayload { field: &'static str, message: String },

    #[error("Invalid features: {0}")]
    Features(#[from] FeatureError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload { .. } | ApiError::Features(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(msg) => json!({
                "error": true,
                "message": msg,
            }),
            ApiError::InvalidPayload { field, message } => json!({
                "error": true,
                "message": message,
                "fields": [field],
            }),
            ApiError::Features(e) => json!({
                "error": true,
                "message": e.to_string(),
                "fields": e.names(),
            }),
            ApiError::Inference(e) => {
                tracing::error!(detail = %e, "Inference failed");
                json!({
                    "error": true,
                    "message": "Prediction failed. Check server logs for details.",
                })
            }
            ApiError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                json!({
                    "error": true,
                    "message": "An internal error occurred",
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
