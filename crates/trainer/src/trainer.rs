//! Random forest trainer
//!
//! Fits a bagged ensemble of CART classification trees. Every random choice
//! flows from `TrainingParams::seed`: tree `i` draws from an LCG seeded with
//! `seed + i`, so the fitted forest is a pure function of data and params.

use khet_model::{FeatureVector, RandomForest, FEATURE_COUNT};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::encoder::LabelEncoder;
use crate::errors::TrainingError;

/// Random forest training configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub max_features: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_estimators: 60,
            seed: 42,
            max_depth: None,
            // floor(sqrt(8))
            max_features: 2,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl TrainingParams {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidParams(
                "n_estimators must be at least 1".into(),
            ));
        }
        if self.max_features == 0 || self.max_features > FEATURE_COUNT {
            return Err(TrainingError::InvalidParams(format!(
                "max_features must be in 1..={FEATURE_COUNT}, got {}",
                self.max_features
            )));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::InvalidParams(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainingError::InvalidParams(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(TrainingError::InvalidParams(
                "max_depth must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Random forest trainer
pub struct ForestTrainer {
    params: TrainingParams,
}

impl ForestTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Fit a forest on every row; no held-out split is taken.
    pub fn train(
        &self,
        features: &[FeatureVector],
        labels: &[String],
    ) -> Result<RandomForest, TrainingError> {
        self.params.validate()?;

        if features.len() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(TrainingError::Empty);
        }

        let targets = LabelEncoder::fit(labels).with_category("fertilizer");
        if targets.len() < 2 {
            return Err(TrainingError::TooFewClasses(targets.len()));
        }

        let codes = labels
            .iter()
            .map(|label| targets.encode(label))
            .collect::<Result<Vec<u32>, _>>()?;
        let rows: Vec<[i64; FEATURE_COUNT]> = features.iter().map(FeatureVector::to_fixed).collect();

        let n_samples = rows.len();
        let tree_config = self.params.tree_config();
        let builder = CartBuilder::new(&rows, &codes, targets.len(), &tree_config);

        let mut trees = Vec::with_capacity(self.params.n_estimators);
        for tree_idx in 0..self.params.n_estimators {
            let mut rng = LcgRng::new(self.params.seed.wrapping_add(tree_idx as u64));

            let sample: Vec<usize> = if self.params.bootstrap {
                (0..n_samples).map(|_| rng.next_index(n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let tree = builder.build(&sample, &mut rng);
            tracing::debug!(
                "Tree {}/{}: {} nodes, depth {}",
                tree_idx + 1,
                self.params.n_estimators,
                tree.nodes.len(),
                tree.depth()
            );
            trees.push(tree);
        }

        Ok(RandomForest::new(
            targets.classes().to_vec(),
            trees,
            self.params.seed,
        ))
    }
}
