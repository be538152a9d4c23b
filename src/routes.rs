use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::features::FEATURE_ORDER;
use crate::model::{ArtifactStatus, ArtifactStore};
use crate::pipeline::{PipelineError, PredictionPipeline};
use crate::types::PredictionOutput;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PredictionPipeline,
}

impl AppState {
    pub fn new(store: Arc<ArtifactStore>, log_predictions: bool) -> Self {
        Self {
            pipeline: PredictionPipeline::new(store).with_feature_logging(log_predictions),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(state)
}

// ---------- Error mapping ----------

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        match self {
            PipelineError::InvalidInput(errs) => {
                let detail: Vec<Value> = errs
                    .iter()
                    .map(|e| {
                        json!({
                            "field": e.field().map_or("body", |f| f.name()),
                            "kind": e.kind(),
                            "message": e.to_string(),
                        })
                    })
                    .collect();
                tracing::debug!("rejected request: {}", errs);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": "invalid input", "detail": detail })),
                )
                    .into_response()
            }
            PipelineError::ArtifactUnavailable { reason } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Model not loaded. Please check server logs for details.",
                    "reason": reason,
                })),
            )
                .into_response(),
            PipelineError::InferenceFailure(e) => {
                tracing::error!("inference failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

// ---------- Handlers ----------

pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionOutput>, PipelineError> {
    state.pipeline.predict_bytes(&body).map(Json)
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Disease Prevalence Prediction API",
        "usage": "Make a POST request to /predict endpoint with the required parameters",
        "documentation": "POST /predict takes a JSON object with the fields listed in `features`",
        "features": FEATURE_ORDER,
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pipeline.store().status() {
        ArtifactStatus::Loaded(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "model_loaded": true })),
        ),
        ArtifactStatus::Unavailable(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "model_loaded": false, "reason": reason })),
        ),
    }
}
