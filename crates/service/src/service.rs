//! Recommendation service
//!
//! Owns the fitted soil and crop encoders plus the classifier. Everything is
//! immutable after construction, so one instance serves concurrent requests
//! behind an `Arc` with no locking.

use khet_model::{Classifier, FeatureVector};
use khet_trainer::{fit_pipeline, Dataset, FittedPipeline, LabelEncoder, TrainingError, TrainingParams};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::errors::{RecommendError, Result};
use crate::request::{RangePolicy, RecommendationRequest};

pub struct RecommendationService {
    soil: LabelEncoder,
    crop: LabelEncoder,
    model: Box<dyn Classifier>,
    policy: RangePolicy,
}

impl fmt::Debug for RecommendationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationService")
            .field("soil", &self.soil.classes())
            .field("crop", &self.crop.classes())
            .field("fertilizers", &self.model.classes())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RecommendationService {
    pub fn new(
        soil: LabelEncoder,
        crop: LabelEncoder,
        model: Box<dyn Classifier>,
        policy: RangePolicy,
    ) -> Self {
        Self {
            soil,
            crop,
            model,
            policy,
        }
    }

    pub fn from_pipeline(pipeline: FittedPipeline, policy: RangePolicy) -> Self {
        Self::new(pipeline.soil, pipeline.crop, Box::new(pipeline.model), policy)
    }

    /// Fit encoders and forest on the whole dataset.
    pub fn fit(
        dataset: &Dataset,
        params: &TrainingParams,
        policy: RangePolicy,
    ) -> std::result::Result<Self, TrainingError> {
        let pipeline = fit_pipeline(dataset, params)?;
        Ok(Self::from_pipeline(pipeline, policy))
    }

    /// Load the configured dataset and train. Runs once at startup.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading training data from {}", config.data_path.display());
        let dataset = Dataset::from_csv(&config.data_path)?;

        let params = config.forest.to_params();
        info!(
            "Training random forest: {} trees, seed {}, max_features {}",
            params.n_estimators, params.seed, params.max_features
        );
        let pipeline = fit_pipeline(&dataset, &params)?;
        let report = TrainingReport::new(&dataset, &pipeline)?;
        info!(
            "Model ready: {} rows, {} soil types, {} crop types, {} fertilizers, fingerprint {}",
            report.rows,
            report.soil_types.len(),
            report.crop_types.len(),
            report.label_counts.len(),
            report.fingerprint
        );

        Ok(Self::from_pipeline(pipeline, config.range_policy))
    }

    pub fn soil_classes(&self) -> &[String] {
        self.soil.classes()
    }

    pub fn crop_classes(&self) -> &[String] {
        self.crop.classes()
    }

    pub fn fertilizer_classes(&self) -> &[String] {
        self.model.classes()
    }

    pub fn range_policy(&self) -> RangePolicy {
        self.policy
    }

    /// Range-check the request and encode it in model column order.
    pub fn feature_vector(
        &self,
        request: &RecommendationRequest,
    ) -> std::result::Result<FeatureVector, RecommendError> {
        let checked = request.checked(self.policy)?;
        let soil_code = self.soil.encode(checked.soil_type.trim())?;
        let crop_code = self.crop.encode(checked.crop_type.trim())?;

        Ok(FeatureVector {
            temperature: checked.temperature,
            humidity: checked.humidity,
            moisture: checked.moisture,
            soil_code,
            crop_code,
            nitrogen: checked.nitrogen,
            phosphorus: checked.phosphorus,
            potassium: checked.potassium,
        })
    }

    /// Recommend a fertilizer label for one request.
    pub fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> std::result::Result<String, RecommendError> {
        let features = self
            .feature_vector(request)
            .inspect_err(|e| debug!("Rejected recommendation request: {}", e))?;
        Ok(self.model.predict(&features)?)
    }
}

/// Summary of a training run, printed by `khet-sahayak train`
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub soil_types: Vec<String>,
    pub crop_types: Vec<String>,
    pub label_counts: BTreeMap<String, usize>,
    pub trees: usize,
    pub nodes: usize,
    pub seed: u64,
    pub fingerprint: String,
    pub training_accuracy: f64,
}

impl TrainingReport {
    pub fn new(dataset: &Dataset, pipeline: &FittedPipeline) -> Result<Self> {
        let training_accuracy = pipeline
            .training_accuracy(dataset)
            .map_err(TrainingError::from)?;

        Ok(Self {
            rows: dataset.len(),
            soil_types: pipeline.soil.classes().to_vec(),
            crop_types: pipeline.crop.classes().to_vec(),
            label_counts: dataset.class_counts(),
            trees: pipeline.model.trees.len(),
            nodes: pipeline.model.node_count(),
            seed: pipeline.model.seed,
            fingerprint: pipeline.model.fingerprint()?,
            training_accuracy,
        })
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows:         {}", self.rows)?;
        writeln!(f, "Soil types:   {}", self.soil_types.join(", "))?;
        writeln!(f, "Crop types:   {}", self.crop_types.join(", "))?;
        writeln!(f, "Fertilizers:")?;
        for (label, count) in &self.label_counts {
            writeln!(f, "  {label:<12} {count}")?;
        }
        writeln!(f, "Trees:        {} ({} nodes, seed {})", self.trees, self.nodes, self.seed)?;
        writeln!(f, "Fingerprint:  {}", self.fingerprint)?;
        write!(
            f,
            "Training accuracy: {:.2}% (measured on the training rows)",
            self.training_accuracy * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khet_model::ModelError;
    use khet_trainer::{TrainingRecord, UnknownCategoryError};
    use std::sync::Mutex;

    use crate::request::InputRangeError;

    /// Records every feature vector it sees and always answers "Urea".
    #[derive(Default)]
    struct RecordingClassifier {
        seen: Mutex<Vec<FeatureVector>>,
        classes: Vec<String>,
    }

    impl Classifier for RecordingClassifier {
        fn predict(&self, features: &FeatureVector) -> std::result::Result<String, ModelError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(*features);
            }
            Ok("Urea".to_string())
        }

        fn classes(&self) -> &[String] {
            &self.classes
        }
    }

    fn request(soil: &str, crop: &str, nitrogen: i64) -> RecommendationRequest {
        RecommendationRequest {
            temperature: 26.0,
            humidity: 52.0,
            moisture: 38.0,
            soil_type: soil.to_string(),
            crop_type: crop.to_string(),
            nitrogen,
            phosphorus: 0,
            potassium: 10,
        }
    }

    fn record(soil: &str, crop: &str, nitrogen: i64, label: &str) -> TrainingRecord {
        TrainingRecord {
            temperature: 28.0,
            humidity: 54.0,
            moisture: 40.0,
            soil_type: soil.to_string(),
            crop_type: crop.to_string(),
            nitrogen,
            phosphorus: 10,
            potassium: 5,
            fertilizer: label.to_string(),
        }
    }

    fn dataset() -> Dataset {
        let mut records = Vec::new();
        for i in 0..12 {
            let soil = ["Sandy", "Loamy", "Clayey"][i % 3];
            let crop = ["Maize", "Wheat"][i % 2];
            records.push(record(soil, crop, (i * 3) as i64, "Urea"));
            records.push(record(soil, crop, 160 + (i * 3) as i64, "DAP"));
        }
        Dataset::from_records(records)
    }

    #[test]
    fn test_features_in_fixed_column_order() {
        let soil = LabelEncoder::fit(["Sandy", "Loamy", "Black"]).with_category("soil type");
        let crop = LabelEncoder::fit(["Wheat", "Maize"]).with_category("crop type");
        let classifier = std::sync::Arc::new(RecordingClassifier::default());

        struct Shared(std::sync::Arc<RecordingClassifier>);
        impl Classifier for Shared {
            fn predict(&self, features: &FeatureVector) -> std::result::Result<String, ModelError> {
                self.0.predict(features)
            }
            fn classes(&self) -> &[String] {
                self.0.classes()
            }
        }

        let service = RecommendationService::new(
            soil,
            crop,
            Box::new(Shared(classifier.clone())),
            RangePolicy::Reject,
        );
        let label = service.recommend(&request(" Sandy ", "Wheat", 37)).unwrap();
        assert_eq!(label, "Urea");

        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        // Black=0, Loamy=1, Sandy=2; Maize=0, Wheat=1
        assert_eq!(
            seen[0].to_array(),
            [26.0, 52.0, 38.0, 2.0, 1.0, 37.0, 0.0, 10.0]
        );
    }

    /// Fails every prediction, so reaching it shows up as a model error.
    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _features: &FeatureVector) -> std::result::Result<String, ModelError> {
            Err(ModelError::PredictionFailed("classifier should not be called".into()))
        }

        fn classes(&self) -> &[String] {
            &[]
        }
    }

    #[test]
    fn test_rejected_request_keeps_its_error() {
        let service = RecommendationService::new(
            LabelEncoder::fit(["Sandy"]).with_category("soil type"),
            LabelEncoder::fit(["Maize"]).with_category("crop type"),
            Box::new(FailingClassifier),
            RangePolicy::Reject,
        );

        let err = service.recommend(&request("Martian", "Maize", 10)).unwrap_err();
        assert_eq!(err.to_string(), "unknown soil type `Martian`");

        let err = service.recommend(&request("Sandy", "Maize", 201)).unwrap_err();
        assert!(matches!(err, RecommendError::InputRange(_)));

        let err = service.recommend(&request("Sandy", "Maize", 10)).unwrap_err();
        assert!(matches!(err, RecommendError::Model(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_unknown_soil_type() {
        let service = RecommendationService::fit(&dataset(), &TrainingParams::default(), RangePolicy::Reject)
            .unwrap();
        let err = service.recommend(&request("Martian", "Maize", 10)).unwrap_err();
        match err {
            RecommendError::UnknownCategory(UnknownCategoryError { category, value }) => {
                assert_eq!(category, "soil type");
                assert_eq!(value, "Martian");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(service
            .recommend(&request("sandy", "Maize", 10))
            .is_err());
    }

    #[test]
    fn test_nitrogen_out_of_range_policies() {
        let data = dataset();
        let params = TrainingParams::default();

        let strict = RecommendationService::fit(&data, &params, RangePolicy::Reject).unwrap();
        let err = strict.recommend(&request("Sandy", "Maize", 201)).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::InputRange(InputRangeError {
                field: "nitrogen",
                ..
            })
        ));
        assert!(err.is_client_error());

        let lenient = RecommendationService::fit(&data, &params, RangePolicy::Clamp).unwrap();
        assert_eq!(
            lenient.recommend(&request("Sandy", "Maize", 201)).unwrap(),
            lenient.recommend(&request("Sandy", "Maize", 200)).unwrap()
        );
        assert_eq!(
            lenient.feature_vector(&request("Sandy", "Maize", 201)).unwrap().nitrogen,
            200
        );
    }

    #[test]
    fn test_boundary_zero_inputs() {
        let service =
            RecommendationService::fit(&dataset(), &TrainingParams::default(), RangePolicy::Reject)
                .unwrap();
        let req = RecommendationRequest {
            temperature: 0.0,
            humidity: 0.0,
            moisture: 0.0,
            soil_type: service.soil_classes()[0].clone(),
            crop_type: service.crop_classes()[0].clone(),
            nitrogen: 0,
            phosphorus: 0,
            potassium: 0,
        };
        let label = service.recommend(&req).unwrap();
        assert!(service.fertilizer_classes().contains(&label));
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let service =
            RecommendationService::fit(&dataset(), &TrainingParams::default(), RangePolicy::Reject)
                .unwrap();
        let req = request("Loamy", "Wheat", 90);
        let first = service.recommend(&req).unwrap();
        for _ in 0..10 {
            assert_eq!(service.recommend(&req).unwrap(), first);
        }
    }

    #[test]
    fn test_separable_predictions() {
        let service =
            RecommendationService::fit(&dataset(), &TrainingParams::default(), RangePolicy::Reject)
                .unwrap();
        assert_eq!(service.recommend(&request("Sandy", "Maize", 5)).unwrap(), "Urea");
        assert_eq!(service.recommend(&request("Clayey", "Wheat", 190)).unwrap(), "DAP");
        assert_eq!(service.fertilizer_classes(), ["DAP", "Urea"]);
    }

    #[test]
    fn test_training_report() {
        let data = dataset();
        let pipeline = fit_pipeline(&data, &TrainingParams::default()).unwrap();
        let report = TrainingReport::new(&data, &pipeline).unwrap();
        assert_eq!(report.rows, 24);
        assert_eq!(report.soil_types, ["Clayey", "Loamy", "Sandy"]);
        assert_eq!(report.label_counts.get("DAP"), Some(&12));
        assert_eq!(report.trees, 60);
        assert_eq!(report.fingerprint.len(), 64);

        let text = report.to_string();
        assert!(text.contains("Rows:         24"));
        assert!(text.contains(&report.fingerprint));
    }
}
