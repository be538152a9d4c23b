//! Request → prediction.
//!
//! availability → validate → assemble → scale → predict → envelope,
//! short-circuiting on the first failure. Stateless apart from the shared,
//! read-only [`ArtifactStore`], so any number of calls may run at once.
//! Nothing here retries: every failure is deterministic for a given input
//! and store.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::features::{assemble, describe};
use crate::model::{ArtifactStatus, ArtifactStore, InferenceError};
use crate::types::PredictionOutput;
use crate::validate::{validate, FieldError, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Artifacts failed to load at startup. Server-side, permanent.
    #[error("model not loaded: {reason}")]
    ArtifactUnavailable { reason: String },
    /// Client-side; carries every field-level violation.
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),
    /// Scaler or model failed for this request only.
    #[error("inference failed: {0}")]
    InferenceFailure(InferenceError),
}

impl From<InferenceError> for PipelineError {
    fn from(e: InferenceError) -> Self {
        match e {
            // unreachable after ensure_available()
            InferenceError::Unavailable => PipelineError::ArtifactUnavailable {
                reason: e.to_string(),
            },
            other => PipelineError::InferenceFailure(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    store: Arc<ArtifactStore>,
    log_features: bool,
}

impl PredictionPipeline {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            log_features: false,
        }
    }

    /// Log a summary of each assembled vector (the `LOG_PRED` signal).
    pub fn with_feature_logging(mut self, on: bool) -> Self {
        self.log_features = on;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn ensure_available(&self) -> Result<(), PipelineError> {
        match self.store.status() {
            ArtifactStatus::Loaded(_) => Ok(()),
            ArtifactStatus::Unavailable(reason) => Err(PipelineError::ArtifactUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    pub fn predict(&self, raw: &Value) -> Result<PredictionOutput, PipelineError> {
        self.ensure_available()?;

        let record = validate(raw).map_err(PipelineError::InvalidInput)?;
        let features = assemble(&record);

        if self.log_features {
            let (nz, mean, std, sample) = describe(&features, 6);
            info!(
                "recv in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
                features.0.len(), nz, mean, std, sample
            );
        }

        let scaled = self.store.transform(&features)?;
        let prevalence_rate = self.store.predict(&scaled)?;
        debug!(prevalence_rate, "prediction ok");

        Ok(PredictionOutput { prevalence_rate })
    }

    /// Same as [`predict`](Self::predict) starting from an unparsed body.
    /// Availability is checked before the body is looked at.
    pub fn predict_bytes(&self, body: &[u8]) -> Result<PredictionOutput, PipelineError> {
        self.ensure_available()?;
        let raw: Value = serde_json::from_slice(body).map_err(|e| {
            PipelineError::InvalidInput(ValidationErrors(vec![FieldError::MalformedBody(
                e.to_string(),
            )]))
        })?;
        self.predict(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LoadedArtifacts, Regressor, Scaler};
    use crate::validate::Field;
    use serde_json::json;

    fn store() -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::from_artifacts(LoadedArtifacts {
            scaler: Scaler::Identity,
            model: Regressor::Linear {
                // picks out education_index
                coefficients: vec![0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                intercept: 1.0,
            },
        }))
    }

    fn body() -> Value {
        json!({
            "healthcare_access": 50, "doctors_per_1000": 2, "hospital_beds_per_1000": 3,
            "per_capita_income": 20000, "education_index": 0.5, "urbanization_rate": 60,
            "population_affected": 1000, "dalys": 500.0, "improvement_5_years": 10,
            "avg_treatment_cost": 200, "gender": 1, "treatment_type": 0
        })
    }

    #[test]
    fn predicts_through_scaler_and_model() {
        let p = PredictionPipeline::new(store());
        assert_eq!(p.predict(&body()).unwrap().prevalence_rate, 6.0);
    }

    #[test]
    fn invalid_input_never_reaches_model() {
        let p = PredictionPipeline::new(store());
        let mut b = body();
        b["gender"] = json!(2);
        match p.predict(&b) {
            Err(PipelineError::InvalidInput(errs)) => {
                assert!(errs.for_field(Field::Gender).is_some())
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unavailable_wins_over_bad_input() {
        let p = PredictionPipeline::new(Arc::new(ArtifactStore::unavailable("gone")));
        for raw in [json!({}), json!(null), body()] {
            assert_eq!(
                p.predict(&raw),
                Err(PipelineError::ArtifactUnavailable {
                    reason: "gone".into()
                })
            );
        }
        assert!(matches!(
            p.predict_bytes(b"{not json"),
            Err(PipelineError::ArtifactUnavailable { .. })
        ));
    }

    #[test]
    fn malformed_body_is_invalid_input() {
        let p = PredictionPipeline::new(store());
        match p.predict_bytes(b"{not json") {
            Err(PipelineError::InvalidInput(errs)) => {
                assert_eq!(errs.0[0].kind(), "malformed_body")
            }
            other => panic!("unexpected {:?}", other),
        }
        let ok = p.predict_bytes(body().to_string().as_bytes()).unwrap();
        assert_eq!(ok.prevalence_rate, 6.0);
    }

    #[test]
    fn model_failure_is_inference_failure() {
        let store = Arc::new(ArtifactStore::from_artifacts(LoadedArtifacts {
            scaler: Scaler::Identity,
            model: Regressor::DecisionTree { nodes: vec![] },
        }));
        let p = PredictionPipeline::new(store).with_feature_logging(true);
        assert!(matches!(
            p.predict(&body()),
            Err(PipelineError::InferenceFailure(InferenceError::Malformed(_)))
        ));
    }
}
