//! Khet Sahayak recommendation service
//!
//! Trains the soil/crop encoders and the fertilizer classifier once at
//! startup, then answers recommendation requests from the CLI or over HTTP.
//!
//! Modules:
//! - `request`: request shape and numeric range policy
//! - `service`: fitted state and the `recommend` operation
//! - `config`: TOML and environment configuration
//! - `api`: axum router and server
//! - `errors`: service error types

pub mod api;
pub mod config;
pub mod errors;
pub mod request;
pub mod service;

pub use config::{ConfigError, ForestConfig, ServiceConfig};
pub use errors::{RecommendError, ServiceError};
pub use request::{InputRangeError, RangePolicy, RecommendationRequest};
pub use service::{RecommendationService, TrainingReport};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
