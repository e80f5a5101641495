//! HTTP request handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{ApiError, Result};
use super::state::AppState;
use crate::feature_mapper::FeatureSet;

#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: FeatureSet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_price: f64,
}

/// `GET /schema`: the feature order the model was trained with
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        features: state.schema.feature_order().to_vec(),
    })
}

/// `POST /predict`: one price prediction for one feature set
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let started = Instant::now();
    let request_id = Uuid::new_v4();

    let Json(request) = payload.map_err(|rejection| {
        state.metrics.record_rejection();
        warn!(request_id = %request_id, error = %rejection.body_text(), "Malformed prediction request");
        match rejection {
            // Valid JSON without a `features` object
            JsonRejection::JsonDataError(e) => ApiError::InvalidPayload {
                field: "features",
                message: e.body_text(),
            },
            other => ApiError::BadRequest(other.body_text()),
        }
    })?;

    let features = state.aliases.resolve(request.features);
    let vector = state.mapper.map(&features).map_err(|e| {
        state.metrics.record_rejection();
        warn!(request_id = %request_id, error = %e, "Prediction request rejected");
        ApiError::from(e)
    })?;

    let engine_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || engine_state.engine.predict(&vector))
        .await
        .map_err(|e| {
            state.metrics.record_failure();
            ApiError::Internal(format!("inference task did not complete: {e}"))
        })?;

    let predicted_price = outcome.map_err(|e| {
        state.metrics.record_failure();
        warn!(request_id = %request_id, "Inference failed for request");
        ApiError::from(e)
    })?;

    let elapsed = started.elapsed();
    state.metrics.record_prediction(elapsed);
    info!(
        request_id = %request_id,
        predicted_price = predicted_price,
        latency_us = elapsed.as_micros() as u64,
        "Prediction served"
    );

    Ok(Json(PredictResponse { predicted_price }))
}
