//! Khet Sahayak trainer
//!
//! Loads the fertilizer training CSV, fits label encoders for the categorical
//! columns and trains a deterministic random forest on the full dataset.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod encoder;
pub mod errors;
pub mod trainer;

use khet_model::{FeatureVector, RandomForest};
use std::path::Path;

pub use dataset::{Dataset, TrainingRecord};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use encoder::LabelEncoder;
pub use errors::{DataLoadError, TrainerError, TrainingError, UnknownCategoryError};
pub use trainer::{ForestTrainer, TrainingParams};

/// Encoders and model fitted together from one dataset
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub soil: LabelEncoder,
    pub crop: LabelEncoder,
    pub model: RandomForest,
}

impl FittedPipeline {
    /// Share of training rows the model reproduces. Measured on the training
    /// data itself, so it is a sanity figure, not a generalization estimate.
    pub fn training_accuracy(&self, dataset: &Dataset) -> Result<f64, UnknownCategoryError> {
        let (features, labels) = feature_matrix(dataset, &self.soil, &self.crop)?;
        Ok(self.model.accuracy(&features, &labels))
    }
}

/// Fit the soil and crop encoders, then the forest, on every row.
pub fn fit_pipeline(
    dataset: &Dataset,
    params: &TrainingParams,
) -> Result<FittedPipeline, TrainingError> {
    let soil = LabelEncoder::fit(dataset.soil_types()).with_category("soil type");
    let crop = LabelEncoder::fit(dataset.crop_types()).with_category("crop type");

    let (features, labels) = feature_matrix(dataset, &soil, &crop)?;
    let model = ForestTrainer::new(params.clone()).train(&features, &labels)?;

    Ok(FittedPipeline { soil, crop, model })
}

/// Train directly from a CSV file.
pub fn fit_pipeline_from_csv(path: &Path, params: &TrainingParams) -> Result<FittedPipeline, TrainerError> {
    let dataset = Dataset::from_csv(path)?;
    Ok(fit_pipeline(&dataset, params)?)
}

fn feature_matrix(
    dataset: &Dataset,
    soil: &LabelEncoder,
    crop: &LabelEncoder,
) -> Result<(Vec<FeatureVector>, Vec<String>), UnknownCategoryError> {
    let features = dataset
        .records()
        .iter()
        .map(|record| record.features(soil, crop))
        .collect::<Result<Vec<_>, _>>()?;
    let labels = dataset.fertilizers().map(str::to_string).collect();
    Ok((features, labels))
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
