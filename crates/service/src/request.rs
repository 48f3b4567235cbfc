//! Recommendation requests and numeric range handling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 60.0);
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);
pub const MOISTURE_RANGE: (f64, f64) = (0.0, 100.0);
pub const NUTRIENT_RANGE: (i64, i64) = (0, 200);

/// The eight raw inputs of one recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub soil_type: String,
    pub crop_type: String,
    pub nitrogen: i64,
    pub phosphorus: i64,
    pub potassium: i64,
}

/// What to do with a numeric input outside its documented range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    #[default]
    Reject,
    Clamp,
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Clamp => f.write_str("clamp"),
        }
    }
}

impl FromStr for RangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("unknown range policy `{other}` (expected reject or clamp)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} {value} is outside the accepted range {min}..={max}")]
pub struct InputRangeError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl RecommendationRequest {
    /// Check every numeric field against its range, returning the request
    /// the model should see. Under `Clamp` the out-of-range fields are
    /// pinned to the nearest bound; NaN and infinities fail either way.
    pub fn checked(&self, policy: RangePolicy) -> Result<Self, InputRangeError> {
        Ok(Self {
            temperature: check_float("temperature", self.temperature, TEMPERATURE_RANGE, policy)?,
            humidity: check_float("humidity", self.humidity, HUMIDITY_RANGE, policy)?,
            moisture: check_float("moisture", self.moisture, MOISTURE_RANGE, policy)?,
            soil_type: self.soil_type.clone(),
            crop_type: self.crop_type.clone(),
            nitrogen: check_int("nitrogen", self.nitrogen, NUTRIENT_RANGE, policy)?,
            phosphorus: check_int("phosphorus", self.phosphorus, NUTRIENT_RANGE, policy)?,
            potassium: check_int("potassium", self.potassium, NUTRIENT_RANGE, policy)?,
        })
    }
}

fn check_float(
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
    policy: RangePolicy,
) -> Result<f64, InputRangeError> {
    let err = InputRangeError {
        field,
        value,
        min,
        max,
    };
    if !value.is_finite() {
        return Err(err);
    }
    if (min..=max).contains(&value) {
        return Ok(value);
    }
    match policy {
        RangePolicy::Reject => Err(err),
        RangePolicy::Clamp => {
            let clamped = value.clamp(min, max);
            warn!("Clamped {} from {} to {}", field, value, clamped);
            Ok(clamped)
        }
    }
}

fn check_int(
    field: &'static str,
    value: i64,
    (min, max): (i64, i64),
    policy: RangePolicy,
) -> Result<i64, InputRangeError> {
    if (min..=max).contains(&value) {
        return Ok(value);
    }
    match policy {
        RangePolicy::Reject => Err(InputRangeError {
            field,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        }),
        RangePolicy::Clamp => {
            let clamped = value.clamp(min, max);
            warn!("Clamped {} from {} to {}", field, value, clamped);
            Ok(clamped)
        }
    }
}
