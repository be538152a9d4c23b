use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;
use tracing::{error, info};

use crate::types::{FeatureVector, ScaledVector, N_FEATURES};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read artifact {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed artifact {}: {reason}", .path.display())]
    Shape { path: PathBuf, reason: String },
    #[error("warmup forward failed: {0}")]
    Probe(#[from] InferenceError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("model artifacts are not loaded")]
    Unavailable,
    #[error("{stage} produced a non-finite value")]
    NonFinite { stage: &'static str },
    #[error("malformed artifact: {0}")]
    Malformed(String),
}

// ---------- Scaler ----------

/// Fitted per-feature normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// z-score: `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `lo + (x - min) * (hi - lo) / (max - min)`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "unit_range")]
        feature_range: (f64, f64),
    },
    Identity,
}

fn unit_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl Scaler {
    fn check(&self) -> Result<(), String> {
        match self {
            Scaler::Standard { mean, scale } => {
                dim("mean", mean)?;
                dim("scale", scale)
            }
            Scaler::MinMax { data_min, data_max, .. } => {
                dim("data_min", data_min)?;
                dim("data_max", data_max)
            }
            Scaler::Identity => Ok(()),
        }
    }

    pub fn transform(&self, x: &FeatureVector) -> Result<ScaledVector, InferenceError> {
        let mut out = x.0;
        match self {
            Scaler::Standard { mean, scale } => {
                for (i, v) in out.iter_mut().enumerate() {
                    *v = (*v - at(mean, i)?) / nonzero(at(scale, i)?);
                }
            }
            Scaler::MinMax { data_min, data_max, feature_range: (lo, hi) } => {
                for (i, v) in out.iter_mut().enumerate() {
                    let min = at(data_min, i)?;
                    let span = nonzero(at(data_max, i)? - min);
                    *v = lo + (*v - min) * (hi - lo) / span;
                }
            }
            Scaler::Identity => {}
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite { stage: "scaler" });
        }
        Ok(ScaledVector(out))
    }
}

// Constant features were fitted with a zero spread; treat it as 1.
fn nonzero(s: f64) -> f64 {
    if s == 0.0 { 1.0 } else { s }
}

// ---------- Regressor ----------

/// One node of an array-encoded regression tree. Node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// Fitted regression model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    DecisionTree { nodes: Vec<TreeNode> },
    RandomForest { trees: Vec<Vec<TreeNode>> },
}

impl Regressor {
    fn check(&self) -> Result<(), String> {
        match self {
            Regressor::Linear { coefficients, .. } => dim("coefficients", coefficients),
            Regressor::DecisionTree { nodes } => check_tree(nodes),
            Regressor::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random forest has no trees".into());
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| check_tree(t).map_err(|e| format!("tree {}: {}", i, e)))
            }
        }
    }

    pub fn predict(&self, x: &ScaledVector) -> Result<f64, InferenceError> {
        let y = match self {
            Regressor::Linear { coefficients, intercept } => {
                if coefficients.len() != N_FEATURES {
                    return Err(InferenceError::Malformed(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        N_FEATURES
                    )));
                }
                intercept + coefficients.iter().zip(x.0).map(|(w, v)| w * v).sum::<f64>()
            }
            Regressor::DecisionTree { nodes } => walk(nodes, x)?,
            Regressor::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(InferenceError::Malformed("random forest has no trees".into()));
                }
                let mut sum = 0.0;
                for t in trees {
                    sum += walk(t, x)?;
                }
                sum / trees.len() as f64
            }
        };
        if !y.is_finite() {
            return Err(InferenceError::NonFinite { stage: "model" });
        }
        Ok(y)
    }
}

fn check_tree(nodes: &[TreeNode]) -> Result<(), String> {
    if nodes.is_empty() {
        return Err("tree has no nodes".into());
    }
    for (i, n) in nodes.iter().enumerate() {
        if let TreeNode::Split { feature, left, right, .. } = *n {
            if feature >= N_FEATURES {
                return Err(format!("node {} splits on feature {}", i, feature));
            }
            if left >= nodes.len() || right >= nodes.len() {
                return Err(format!("node {} has a child outside the tree", i));
            }
        }
    }
    Ok(())
}

fn walk(nodes: &[TreeNode], x: &ScaledVector) -> Result<f64, InferenceError> {
    let mut i = 0;
    // A well-formed tree reaches a leaf in at most nodes.len() steps.
    for _ in 0..=nodes.len() {
        match nodes.get(i) {
            Some(TreeNode::Leaf { value }) => return Ok(*value),
            Some(TreeNode::Split { feature, threshold, left, right }) => {
                let v = *x.0.get(*feature).ok_or_else(|| {
                    InferenceError::Malformed(format!("split on feature {}", feature))
                })?;
                i = if v <= *threshold { *left } else { *right };
            }
            None => return Err(InferenceError::Malformed(format!("no tree node {}", i))),
        }
    }
    Err(InferenceError::Malformed("tree walk does not terminate".into()))
}

fn dim(name: &str, v: &[f64]) -> Result<(), String> {
    if v.len() != N_FEATURES {
        return Err(format!("{} has {} entries, expected {}", name, v.len(), N_FEATURES));
    }
    Ok(())
}

fn at(v: &[f64], i: usize) -> Result<f64, InferenceError> {
    v.get(i)
        .copied()
        .ok_or_else(|| InferenceError::Malformed(format!("scaler has no entry {}", i)))
}

// ---------- Store ----------

/// Scaler and model as loaded at startup. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub scaler: Scaler,
    pub model: Regressor,
}

#[derive(Debug, Clone)]
pub enum ArtifactStatus {
    Loaded(LoadedArtifacts),
    Unavailable(String),
}

/// Process-lifetime holder of the artifacts. Construct once, share behind
/// an `Arc`; there is no reload.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    status: ArtifactStatus,
}

impl ArtifactStore {
    /// Read, parse and shape-check both artifacts, then run one forward pass
    /// on an all-zero vector.
    pub fn load(
        model_path: impl AsRef<Path>,
        scaler_path: impl AsRef<Path>,
    ) -> Result<LoadedArtifacts, LoadError> {
        let model: Regressor = read_json(model_path.as_ref())?;
        model.check().map_err(|reason| LoadError::Shape {
            path: model_path.as_ref().to_path_buf(),
            reason,
        })?;

        let scaler: Scaler = read_json(scaler_path.as_ref())?;
        scaler.check().map_err(|reason| LoadError::Shape {
            path: scaler_path.as_ref().to_path_buf(),
            reason,
        })?;

        let art = LoadedArtifacts { scaler, model };
        // Warmup to surface artifacts that parse but cannot run
        let probe = art.scaler.transform(&FeatureVector([0.0; N_FEATURES]))?;
        art.model.predict(&probe)?;
        Ok(art)
    }

    /// Like [`load`](Self::load), but a failure leaves the store permanently
    /// unavailable instead of returning an error.
    pub fn open(model_path: impl AsRef<Path>, scaler_path: impl AsRef<Path>) -> Self {
        let (m, s) = (model_path.as_ref(), scaler_path.as_ref());
        info!("loading model from {}", m.display());
        info!("loading scaler from {}", s.display());
        match Self::load(m, s) {
            Ok(art) => {
                info!("model and scaler loaded successfully");
                Self::from_artifacts(art)
            }
            Err(e) => {
                error!("error loading model/scaler: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn from_artifacts(art: LoadedArtifacts) -> Self {
        Self {
            status: ArtifactStatus::Loaded(art),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: ArtifactStatus::Unavailable(reason.into()),
        }
    }

    pub fn status(&self) -> &ArtifactStatus {
        &self.status
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, ArtifactStatus::Loaded(_))
    }

    fn artifacts(&self) -> Result<&LoadedArtifacts, InferenceError> {
        match &self.status {
            ArtifactStatus::Loaded(a) => Ok(a),
            ArtifactStatus::Unavailable(_) => Err(InferenceError::Unavailable),
        }
    }

    pub fn transform(&self, x: &FeatureVector) -> Result<ScaledVector, InferenceError> {
        self.artifacts()?.scaler.transform(x)
    }

    pub fn predict(&self, x: &ScaledVector) -> Result<f64, InferenceError> {
        self.artifacts()?.model.predict(x)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let txt = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
