//! Disease prevalence inference service.
//!
//! A request's twelve indicators are validated, laid out in training order,
//! scaled and fed to a regression model loaded once at startup. See
//! [`pipeline::PredictionPipeline`] for the request path and
//! [`model::ArtifactStore`] for artifact loading.

pub mod config;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod routes;
pub mod types;
pub mod validate;

pub use features::{assemble, FEATURE_ORDER};
pub use model::{ArtifactStatus, ArtifactStore, InferenceError, LoadError, LoadedArtifacts};
pub use pipeline::{PipelineError, PredictionPipeline};
pub use types::{FeatureVector, IndicatorRecord, PredictionOutput, ScaledVector};
pub use validate::{validate, Field, FieldError, ValidationErrors};
