//! End-to-end recommendation flow: CSV on disk -> config -> trained service

use anyhow::Result;
use khet_service::{RangePolicy, RecommendError, RecommendationRequest, RecommendationService, ServiceConfig};
use std::io::Write;
use tempfile::NamedTempFile;

/// Only nitrogen carries signal: low -> Urea, high -> DAP. One row per
/// nitrogen level uses a trailing space on the soil type.
fn nitrogen_dataset() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        " Temparature , Humidity ,Moisture,Soil Type,Crop Type,Nitrogen,Potassium,Phosphorous,Fertilizer Name"
    )?;
    for i in 0..10 {
        let soil = if i % 2 == 0 { "Clay" } else { "Clay " };
        writeln!(file, "30,60,40,{soil},Maize,{},10,20,Urea", i * 5)?;
        writeln!(file, "30,60,40,{soil},Maize,{},10,20,DAP", 160 + i * 4)?;
    }
    file.flush()?;
    Ok(file)
}

fn request(nitrogen: i64) -> RecommendationRequest {
    RecommendationRequest {
        temperature: 30.0,
        humidity: 60.0,
        moisture: 40.0,
        soil_type: "Clay".to_string(),
        crop_type: "Maize".to_string(),
        nitrogen,
        phosphorus: 20,
        potassium: 10,
    }
}

fn config_for(file: &NamedTempFile, policy: RangePolicy) -> ServiceConfig {
    ServiceConfig {
        data_path: file.path().to_path_buf(),
        range_policy: policy,
        ..ServiceConfig::default()
    }
}

#[test]
fn test_recommend_from_csv() -> Result<()> {
    let file = nitrogen_dataset()?;
    let service = RecommendationService::from_config(&config_for(&file, RangePolicy::Reject))?;

    assert_eq!(service.soil_classes(), ["Clay"]);
    assert_eq!(service.crop_classes(), ["Maize"]);
    assert_eq!(service.fertilizer_classes(), ["DAP", "Urea"]);

    assert_eq!(service.recommend(&request(10))?, "Urea");
    assert_eq!(service.recommend(&request(190))?, "DAP");

    // a padded category matches its trimmed vocabulary entry
    let mut padded = request(10);
    padded.soil_type = "Clay ".to_string();
    assert_eq!(service.recommend(&padded)?, "Urea");

    Ok(())
}

#[test]
fn test_out_of_range_reject_and_clamp() -> Result<()> {
    let file = nitrogen_dataset()?;

    let strict = RecommendationService::from_config(&config_for(&file, RangePolicy::Reject))?;
    let err = strict.recommend(&request(250)).unwrap_err();
    assert!(matches!(err, RecommendError::InputRange(_)));
    assert_eq!(
        err.to_string(),
        "nitrogen 250 is outside the accepted range 0..=200"
    );

    let lenient = RecommendationService::from_config(&config_for(&file, RangePolicy::Clamp))?;
    assert_eq!(lenient.range_policy(), RangePolicy::Clamp);
    assert_eq!(lenient.recommend(&request(250))?, "DAP");

    Ok(())
}

#[test]
fn test_same_seed_same_answers() -> Result<()> {
    let file = nitrogen_dataset()?;
    let config = config_for(&file, RangePolicy::Reject);

    let first = RecommendationService::from_config(&config)?;
    let second = RecommendationService::from_config(&config)?;
    for nitrogen in (0..=200).step_by(10) {
        assert_eq!(
            first.recommend(&request(nitrogen))?,
            second.recommend(&request(nitrogen))?
        );
    }

    Ok(())
}

#[test]
fn test_missing_dataset_fails_startup() {
    let config = ServiceConfig {
        data_path: "/definitely/not/here.csv".into(),
        ..ServiceConfig::default()
    };
    let err = RecommendationService::from_config(&config).unwrap_err();
    assert!(matches!(err, khet_service::ServiceError::DataLoad(_)));
}

#[test]
fn test_invalid_config_fails_startup() -> Result<()> {
    let file = nitrogen_dataset()?;
    let mut config = config_for(&file, RangePolicy::Reject);
    config.forest.n_estimators = 0;

    let err = RecommendationService::from_config(&config).unwrap_err();
    assert!(matches!(err, khet_service::ServiceError::Config(_)));

    Ok(())
}
