//! Fixed-order feature vector consumed by the classifier.
//!
//! Column order is part of the model contract: trees are fitted on exactly
//! this layout, and reordering columns at inference silently produces wrong
//! predictions. Trees compare fixed-point integers (milli-units) so split
//! thresholds are identical on every platform.

use serde::{Deserialize, Serialize};

/// Number of model input columns
pub const FEATURE_COUNT: usize = 8;

/// Column names in model order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temperature",
    "humidity",
    "moisture",
    "soil_type",
    "crop_type",
    "nitrogen",
    "phosphorus",
    "potassium",
];

/// Fixed-point scale applied to every column (1 unit = 1/1000)
pub const FEATURE_SCALE: i64 = 1_000;

/// One model input row with categorical columns already encoded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub soil_code: u32,
    pub crop_code: u32,
    pub nitrogen: i64,
    pub phosphorus: i64,
    pub potassium: i64,
}

impl FeatureVector {
    /// Columns as floats, in model order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.moisture,
            f64::from(self.soil_code),
            f64::from(self.crop_code),
            self.nitrogen as f64,
            self.phosphorus as f64,
            self.potassium as f64,
        ]
    }

    /// Columns as fixed-point integers, in model order.
    ///
    /// Floats are rounded to the nearest milli-unit. Out-of-range values
    /// saturate and NaN maps to zero.
    pub fn to_fixed(&self) -> [i64; FEATURE_COUNT] {
        [
            float_to_fixed(self.temperature),
            float_to_fixed(self.humidity),
            float_to_fixed(self.moisture),
            i64::from(self.soil_code) * FEATURE_SCALE,
            i64::from(self.crop_code) * FEATURE_SCALE,
            self.nitrogen.saturating_mul(FEATURE_SCALE),
            self.phosphorus.saturating_mul(FEATURE_SCALE),
            self.potassium.saturating_mul(FEATURE_SCALE),
        ]
    }
}

fn float_to_fixed(value: f64) -> i64 {
    // `as` saturates at the i64 bounds and maps NaN to 0
    (value * FEATURE_SCALE as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            temperature: 26.5,
            humidity: 52.0,
            moisture: 38.25,
            soil_code: 2,
            crop_code: 5,
            nitrogen: 37,
            phosphorus: 0,
            potassium: 13,
        }
    }

    #[test]
    fn test_fixed_point_column_order() {
        let fixed = sample().to_fixed();
        assert_eq!(
            fixed,
            [26_500, 52_000, 38_250, 2_000, 5_000, 37_000, 0, 13_000]
        );
    }

    #[test]
    fn test_array_matches_names() {
        let values = sample().to_array();
        assert_eq!(values.len(), FEATURE_NAMES.len());
        assert_eq!(values[3], 2.0);
        assert_eq!(values[7], 13.0);
    }

    #[test]
    fn test_rounding_and_saturation() {
        let mut fv = sample();
        fv.temperature = 0.0004;
        fv.humidity = 0.0006;
        fv.moisture = f64::NAN;
        let fixed = fv.to_fixed();
        assert_eq!(fixed[0], 0);
        assert_eq!(fixed[1], 1);
        assert_eq!(fixed[2], 0);

        fv.temperature = f64::INFINITY;
        fv.nitrogen = i64::MAX;
        let fixed = fv.to_fixed();
        assert_eq!(fixed[0], i64::MAX);
        assert_eq!(fixed[5], i64::MAX);
    }
}
