//! Khet Sahayak model layer
//!
//! Integer-only classification trees and a majority-vote random forest over
//! the eight-column soil and climate feature vector.
//!
//! Modules:
//! - `features`: fixed-order feature vector and fixed-point conversion
//! - `tree`: classification tree nodes and traversal
//! - `forest`: random forest ensemble and voting
//! - `canon`: canonical JSON serialization and BLAKE3 fingerprints
//! - `errors`: model error types

pub mod canon;
pub mod errors;
pub mod features;
pub mod forest;
pub mod tree;

pub use errors::ModelError;
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES, FEATURE_SCALE};
pub use forest::RandomForest;
pub use tree::{Node, Tree};

/// A fitted model that maps a feature vector to a fertilizer label.
///
/// Implementations are immutable after construction and shared across
/// request handlers without locking.
pub trait Classifier: Send + Sync {
    /// Predict the label for a single feature vector.
    fn predict(&self, features: &FeatureVector) -> Result<String, ModelError>;

    /// Labels this classifier can emit, in code order.
    fn classes(&self) -> &[String];
}

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
