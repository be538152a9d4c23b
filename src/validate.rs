//! Request validation: raw JSON object → [`IndicatorRecord`].
//!
//! Every field is mandatory and range-checked (bounds inclusive). All
//! violations are collected, reported in feature order, so a client sees
//! every problem with its request at once.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::features::FEATURE_ORDER;
use crate::types::{IndicatorRecord, N_FEATURES};

/// The twelve request fields, declared in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    HealthcareAccess,
    DoctorsPer1000,
    HospitalBedsPer1000,
    PerCapitaIncome,
    EducationIndex,
    UrbanizationRate,
    PopulationAffected,
    Dalys,
    Improvement5Years,
    AvgTreatmentCost,
    Gender,
    TreatmentType,
}

impl Field {
    pub const ALL: [Field; N_FEATURES] = [
        Field::HealthcareAccess,
        Field::DoctorsPer1000,
        Field::HospitalBedsPer1000,
        Field::PerCapitaIncome,
        Field::EducationIndex,
        Field::UrbanizationRate,
        Field::PopulationAffected,
        Field::Dalys,
        Field::Improvement5Years,
        Field::AvgTreatmentCost,
        Field::Gender,
        Field::TreatmentType,
    ];

    /// JSON key of the field.
    pub fn name(self) -> &'static str {
        FEATURE_ORDER[self as usize]
    }

    /// Inclusive `(min, max)`; `max` is `f64::INFINITY` when unbounded.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Field::HealthcareAccess | Field::UrbanizationRate => (0.0, 100.0),
            Field::DoctorsPer1000 | Field::HospitalBedsPer1000 => (0.0, 20.0),
            Field::PerCapitaIncome => (0.0, 100_000.0),
            Field::EducationIndex => (0.0, 1.0),
            Field::PopulationAffected | Field::Dalys | Field::AvgTreatmentCost => {
                (0.0, f64::INFINITY)
            }
            Field::Improvement5Years => (-100.0, 100.0),
            Field::Gender => (0.0, 1.0),
            Field::TreatmentType => (0.0, 2.0),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Field::PopulationAffected | Field::Gender | Field::TreatmentType
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("{0}: field required")]
    Missing(Field),
    #[error("{field}: expected {expected}")]
    WrongType { field: Field, expected: &'static str },
    #[error("{field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: Field,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("malformed JSON body: {0}")]
    MalformedBody(String),
}

impl FieldError {
    /// Offending field, or `None` for whole-body errors.
    pub fn field(&self) -> Option<Field> {
        match self {
            FieldError::Missing(f) => Some(*f),
            FieldError::WrongType { field, .. } | FieldError::OutOfRange { field, .. } => {
                Some(*field)
            }
            FieldError::NotAnObject | FieldError::MalformedBody(_) => None,
        }
    }

    /// Short machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldError::Missing(_) => "missing",
            FieldError::WrongType { .. } => "wrong_type",
            FieldError::OutOfRange { .. } => "out_of_range",
            FieldError::NotAnObject => "not_an_object",
            FieldError::MalformedBody(_) => "malformed_body",
        }
    }
}

/// Non-empty list of everything wrong with one request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn join(errs: &[FieldError]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First error reported against `field`, if any.
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field() == Some(field))
    }
}

/// Validate a raw request body.
pub fn validate(raw: &Value) -> Result<IndicatorRecord, ValidationErrors> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationErrors(vec![FieldError::NotAnObject]))?;
    validate_object(obj)
}

pub fn validate_object(obj: &Map<String, Value>) -> Result<IndicatorRecord, ValidationErrors> {
    for key in obj.keys().filter(|k| !FEATURE_ORDER.contains(&k.as_str())) {
        debug!("ignoring unknown field {:?}", key);
    }

    let mut x = [0.0f64; N_FEATURES];
    let mut errors = Vec::new();
    for field in Field::ALL {
        match check_field(field, obj.get(field.name())) {
            Ok(v) => x[field as usize] = v,
            Err(e) => errors.push(e),
        }
    }

    // Second, dedicated pass over the education index. It duplicates the
    // generic [0, 1] bound on purpose and must stay even if the table changes.
    let edu = Field::EducationIndex;
    if !errors.iter().any(|e| e.field() == Some(edu)) {
        if let Err(e) = education_index_rule(x[edu as usize]) {
            errors.push(e);
        }
    }

    if !errors.is_empty() {
        return Err(ValidationErrors(errors));
    }

    Ok(IndicatorRecord {
        healthcare_access: x[0],
        doctors_per_1000: x[1],
        hospital_beds_per_1000: x[2],
        per_capita_income: x[3],
        education_index: x[4],
        urbanization_rate: x[5],
        population_affected: x[6],
        dalys: x[7],
        improvement_5_years: x[8],
        avg_treatment_cost: x[9],
        gender: x[10] as u8,
        treatment_type: x[11] as u8,
    })
}

/// Education index must lie in `[0, 1]`.
pub fn education_index_rule(v: f64) -> Result<(), FieldError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(FieldError::OutOfRange {
            field: Field::EducationIndex,
            value: v,
            min: 0.0,
            max: 1.0,
        })
    }
}

fn check_field(field: Field, v: Option<&Value>) -> Result<f64, FieldError> {
    let v = match v {
        None | Some(Value::Null) => return Err(FieldError::Missing(field)),
        Some(v) => v,
    };

    let x = if field.is_integer() {
        integer(v).ok_or(FieldError::WrongType {
            field,
            expected: "integer",
        })?
    } else {
        v.as_f64().ok_or(FieldError::WrongType {
            field,
            expected: "number",
        })?
    };

    let (min, max) = field.bounds();
    // `contains` is false for NaN as well
    if !(min..=max).contains(&x) {
        return Err(FieldError::OutOfRange {
            field,
            value: x,
            min,
            max,
        });
    }
    Ok(x)
}

/// JSON integers, plus floats with no fractional part (`2.0`).
fn integer(v: &Value) -> Option<f64> {
    if let Some(i) = v.as_i64() {
        return Some(i as f64);
    }
    if let Some(u) = v.as_u64() {
        return Some(u as f64);
    }
    v.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)
}
