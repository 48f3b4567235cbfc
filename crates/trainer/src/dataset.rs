//! CSV training data loading
//!
//! Columns are located by header name, so the file may order them freely and
//! carry extra columns. Headers and every field are whitespace-trimmed before
//! use: `"Clay"` and `"Clay "` must not become two soil classes.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use khet_model::{FeatureVector, FEATURE_SCALE};

use crate::encoder::LabelEncoder;
use crate::errors::{DataLoadError, UnknownCategoryError};

/// One row of the training file
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub soil_type: String,
    pub crop_type: String,
    pub nitrogen: i64,
    pub phosphorus: i64,
    pub potassium: i64,
    pub fertilizer: String,
}

impl TrainingRecord {
    /// Feature vector for this row using the given encoders
    pub fn features(
        &self,
        soil: &LabelEncoder,
        crop: &LabelEncoder,
    ) -> Result<FeatureVector, UnknownCategoryError> {
        Ok(FeatureVector {
            temperature: self.temperature,
            humidity: self.humidity,
            moisture: self.moisture,
            soil_code: soil.encode(&self.soil_type)?,
            crop_code: crop.encode(&self.crop_type)?,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Temperature,
    Humidity,
    Moisture,
    SoilType,
    CropType,
    Nitrogen,
    Phosphorus,
    Potassium,
    Fertilizer,
}

impl Column {
    const ALL: [Column; 9] = [
        Column::Temperature,
        Column::Humidity,
        Column::Moisture,
        Column::SoilType,
        Column::CropType,
        Column::Nitrogen,
        Column::Phosphorus,
        Column::Potassium,
        Column::Fertilizer,
    ];

    fn name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Accepted header spellings; the first is canonical
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Temperature => &["Temperature", "Temparature"],
            Column::Humidity => &["Humidity"],
            Column::Moisture => &["Moisture"],
            Column::SoilType => &["Soil Type"],
            Column::CropType => &["Crop Type"],
            Column::Nitrogen => &["Nitrogen"],
            Column::Phosphorus => &["Phosphorus", "Phosphorous"],
            Column::Potassium => &["Potassium"],
            Column::Fertilizer => &["Fertilizer", "Fertilizer Name"],
        }
    }
}

/// Header position of every required column
struct ColumnLayout {
    positions: [usize; 9],
}

impl ColumnLayout {
    fn resolve(headers: &StringRecord) -> Result<Self, DataLoadError> {
        let mut positions = [0usize; 9];
        for (slot, column) in positions.iter_mut().zip(Column::ALL) {
            *slot = headers
                .iter()
                .position(|header| {
                    let header = header.trim();
                    column
                        .aliases()
                        .iter()
                        .any(|alias| header.eq_ignore_ascii_case(alias))
                })
                .ok_or(DataLoadError::MissingColumn(column.name()))?;
        }
        Ok(Self { positions })
    }

    fn raw<'r>(&self, row: &'r StringRecord, column: Column) -> &'r str {
        row.get(self.positions[column as usize]).unwrap_or("").trim()
    }

    fn text(&self, row: &StringRecord, column: Column, line: u64) -> Result<String, DataLoadError> {
        let value = self.raw(row, column);
        if value.is_empty() {
            return Err(DataLoadError::EmptyValue {
                line,
                column: column.name(),
            });
        }
        Ok(value.to_string())
    }

    fn float(&self, row: &StringRecord, column: Column, line: u64) -> Result<f64, DataLoadError> {
        let value = self.raw(row, column);
        value
            .parse::<f64>()
            .ok()
            .filter(|&v| fits_fixed_point(v))
            .ok_or_else(|| DataLoadError::InvalidNumber {
                line,
                column: column.name(),
                value: value.to_string(),
            })
    }

    /// Integer cell; integral floats such as `37.0` are accepted
    fn integer(&self, row: &StringRecord, column: Column, line: u64) -> Result<i64, DataLoadError> {
        let value = self.raw(row, column);
        value
            .parse::<i64>()
            .ok()
            .or_else(|| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|&v| fits_fixed_point(v) && v.fract() == 0.0)
                    // in range and integral, so the cast is exact
                    .map(|v| v as i64)
            })
            .filter(|v| v.checked_mul(FEATURE_SCALE).is_some())
            .ok_or_else(|| DataLoadError::InvalidNumber {
                line,
                column: column.name(),
                value: value.to_string(),
            })
    }

    fn record(&self, row: &StringRecord, line: u64) -> Result<TrainingRecord, DataLoadError> {
        Ok(TrainingRecord {
            temperature: self.float(row, Column::Temperature, line)?,
            humidity: self.float(row, Column::Humidity, line)?,
            moisture: self.float(row, Column::Moisture, line)?,
            soil_type: self.text(row, Column::SoilType, line)?,
            crop_type: self.text(row, Column::CropType, line)?,
            nitrogen: self.integer(row, Column::Nitrogen, line)?,
            phosphorus: self.integer(row, Column::Phosphorus, line)?,
            potassium: self.integer(row, Column::Potassium, line)?,
            fertilizer: self.text(row, Column::Fertilizer, line)?,
        })
    }
}

/// True when `value` survives the model's milli-unit conversion without
/// saturating.
fn fits_fixed_point(value: f64) -> bool {
    value.is_finite() && value.abs() * (FEATURE_SCALE as f64) < i64::MAX as f64
}

/// Training dataset, loaded once and read-only afterwards
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    records: Vec<TrainingRecord>,
}

impl Dataset {
    /// Load dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Load dataset from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataLoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let layout = ColumnLayout::resolve(reader.headers()?)?;

        let mut records = Vec::new();
        for (row_idx, row) in reader.records().enumerate() {
            let row = row?;
            // header is line 1
            let line = row
                .position()
                .map(|p| p.line())
                .unwrap_or(row_idx as u64 + 2);
            records.push(layout.record(&row, line)?);
        }

        if records.is_empty() {
            return Err(DataLoadError::Empty);
        }

        tracing::debug!("Parsed {} training rows", records.len());
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<TrainingRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn soil_types(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.soil_type.as_str())
    }

    pub fn crop_types(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.crop_type.as_str())
    }

    pub fn fertilizers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.fertilizer.as_str())
    }

    /// Row count per fertilizer label, sorted by label
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in self.fertilizers() {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
