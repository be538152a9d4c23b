use serde::{Deserialize, Serialize};

/// Number of indicators the scaler and model were fitted on.
pub const N_FEATURES: usize = 12;

/// One cohort's measured indicators. Only the validator builds these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRecord {
    pub healthcare_access: f64,      // %
    pub doctors_per_1000: f64,
    pub hospital_beds_per_1000: f64,
    pub per_capita_income: f64,      // USD
    pub education_index: f64,        // 0..=1
    pub urbanization_rate: f64,      // %
    pub population_affected: f64,    // whole number, carried as sent
    pub dalys: f64,                  // disability-adjusted life years
    pub improvement_5_years: f64,    // %
    pub avg_treatment_cost: f64,     // USD
    pub gender: u8,                  // 0=female, 1=male
    pub treatment_type: u8,          // 0, 1 or 2, encoded at training time
}

/// Raw indicators in training order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; N_FEATURES]);

/// Indicators after the fitted scaler, same order as [`FeatureVector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledVector(pub [f64; N_FEATURES]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl ScaledVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Response envelope of `POST /predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// Predicted disease prevalence rate (%). Not clamped.
    pub prevalence_rate: f64,
}
