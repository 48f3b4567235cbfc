//! Service configuration
//!
//! Layered as defaults, then an optional TOML file, then `KHET_*`
//! environment variables. CLI flags are applied last by the binary.

use khet_trainer::TrainingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::request::RangePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidOverride {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub range_policy: RangePolicy,
    pub forest: ForestConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("Fertilizer_recommendation.csv"),
            host: "0.0.0.0".to_string(),
            port: 8501,
            range_policy: RangePolicy::Reject,
            forest: ForestConfig::default(),
        }
    }
}

/// `[forest]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// 0 means unlimited
    pub max_depth: usize,
    pub max_features: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        let params = TrainingParams::default();
        Self {
            n_estimators: params.n_estimators,
            seed: params.seed,
            max_depth: params.max_depth.unwrap_or(0),
            max_features: params.max_features,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        }
    }
}

impl ForestConfig {
    pub fn to_params(&self) -> TrainingParams {
        TrainingParams {
            n_estimators: self.n_estimators,
            seed: self.seed,
            max_depth: (self.max_depth > 0).then_some(self.max_depth),
            max_features: self.max_features,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            bootstrap: true,
        }
    }
}

impl ServiceConfig {
    /// Parse a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `KHET_*` overrides from any key lookup. Unparseable values are
    /// errors rather than being skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("KHET_DATA_PATH") {
            self.data_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("KHET_HOST") {
            self.host = value;
        }
        if let Some(value) = lookup("KHET_PORT") {
            self.port = parse_override("KHET_PORT", &value)?;
        }
        if let Some(value) = lookup("KHET_RANGE_POLICY") {
            self.range_policy = parse_override("KHET_RANGE_POLICY", &value)?;
        }
        if let Some(value) = lookup("KHET_TREES") {
            self.forest.n_estimators = parse_override("KHET_TREES", &value)?;
        }
        if let Some(value) = lookup("KHET_SEED") {
            self.forest.seed = parse_override("KHET_SEED", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.forest.n_estimators == 0 {
            return Err(ConfigError::Invalid(
                "forest.n_estimators must be at least 1".into(),
            ));
        }
        self.forest
            .to_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_override<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8501);
        assert_eq!(config.range_policy, RangePolicy::Reject);
        assert_eq!(config.forest.n_estimators, 60);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.forest.to_params(), TrainingParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 9000\nrange_policy = \"clamp\"\n\n[forest]\nn_estimators = 12\nmax_depth = 6"
        )
        .unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.range_policy, RangePolicy::Clamp);
        assert_eq!(config.forest.n_estimators, 12);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.forest.to_params().max_depth, Some(6));
    }

    #[test]
    fn test_bad_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"eighty\"").unwrap();
        let err = ServiceConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides(lookup(&[
                ("KHET_DATA_PATH", "/data/fert.csv"),
                ("KHET_PORT", "8080"),
                ("KHET_RANGE_POLICY", "clamp"),
                ("KHET_TREES", "10"),
                ("KHET_SEED", "7"),
            ]))
            .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/data/fert.csv"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.range_policy, RangePolicy::Clamp);
        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.forest.seed, 7);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_malformed_override_is_error() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(lookup(&[("KHET_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                key: "KHET_PORT",
                ..
            }
        ));

        let err = config
            .apply_overrides(lookup(&[("KHET_RANGE_POLICY", "ignore")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_port_and_trees() {
        let config = ServiceConfig {
            port: 0,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.forest.n_estimators = 0;
        assert!(config.validate().is_err());
    }
}
