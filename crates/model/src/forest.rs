//! Random forest classifier with deterministic majority voting
//!
//! Each tree votes for one class code; the code with the most votes wins and
//! ties go to the lowest code, so predictions never depend on iteration order.

use serde::{Deserialize, Serialize};

use crate::canon::{hash_canonical_hex, to_canonical_json};
use crate::errors::{ModelError, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};
use crate::tree::Tree;
use crate::Classifier;

/// Current serialization format version
pub const FOREST_FORMAT_VERSION: i32 = 1;

/// Fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RandomForest {
    /// Model format version
    pub version: i32,

    /// Target labels in code order (leaf values index into this list)
    pub classes: Vec<String>,

    /// Trees in the ensemble
    pub trees: Vec<Tree>,

    /// Width of the feature vector the trees were fitted on
    pub feature_count: usize,

    /// Seed the trainer used
    pub seed: u64,
}

impl RandomForest {
    pub fn new(classes: Vec<String>, trees: Vec<Tree>, seed: u64) -> Self {
        Self {
            version: FOREST_FORMAT_VERSION,
            classes,
            trees,
            feature_count: FEATURE_COUNT,
            seed,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != FOREST_FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.feature_count != FEATURE_COUNT {
            return Err(ModelError::ValidationFailed(format!(
                "Model expects {} features, pipeline provides {}",
                self.feature_count, FEATURE_COUNT
            )));
        }

        if self.classes.is_empty() {
            return Err(ModelError::ValidationFailed("Model has no classes".into()));
        }

        if self.trees.is_empty() {
            return Err(ModelError::ValidationFailed("Model has no trees".into()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count, self.classes.len())
                .map_err(|e| {
                    ModelError::ValidationFailed(format!("Tree {i} validation failed: {e}"))
                })?;
        }

        Ok(())
    }

    /// Per-class vote counts for one input
    pub fn votes(&self, features: &FeatureVector) -> Vec<u32> {
        let fixed = features.to_fixed();
        let mut votes = vec![0u32; self.classes.len()];

        for tree in &self.trees {
            if let Some(slot) = tree
                .evaluate(&fixed)
                .and_then(|class| votes.get_mut(class as usize))
            {
                *slot += 1;
            }
        }

        votes
    }

    /// Winning class code, or `None` when no tree produced a vote
    pub fn predict_code(&self, features: &FeatureVector) -> Option<u32> {
        let mut best: Option<(usize, u32)> = None;
        for (code, &count) in self.votes(features).iter().enumerate() {
            if count == 0 {
                continue;
            }
            // strict `>` keeps the lowest code on ties
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((code, count));
            }
        }
        best.map(|(code, _)| code as u32)
    }

    /// Winning label
    pub fn predict_label(&self, features: &FeatureVector) -> Option<&str> {
        self.predict_code(features)
            .and_then(|code| self.classes.get(code as usize))
            .map(String::as_str)
    }

    /// Fraction of rows whose prediction matches the label
    pub fn accuracy(&self, rows: &[FeatureVector], labels: &[String]) -> f64 {
        if rows.is_empty() || rows.len() != labels.len() {
            return 0.0;
        }
        let hits = rows
            .iter()
            .zip(labels)
            .filter(|(row, label)| self.predict_label(row) == Some(label.as_str()))
            .count();
        hits as f64 / rows.len() as f64
    }

    /// Total node count across all trees
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(|t| t.nodes.len()).sum()
    }

    /// Canonical JSON form (sorted keys, compact)
    pub fn to_canonical_json(&self) -> Result<String> {
        to_canonical_json(self)
    }

    /// Hex BLAKE3 hash of the canonical JSON
    pub fn fingerprint(&self) -> Result<String> {
        hash_canonical_hex(self)
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &FeatureVector) -> Result<String> {
        self.predict_label(features)
            .map(str::to_string)
            .ok_or_else(|| ModelError::PredictionFailed("no tree produced a vote".into()))
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}
