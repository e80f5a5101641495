//! House Price Inference Service
//!
//! Serves point predictions from a pre-trained residential property price
//! regression model. Requests are named feature sets; the service validates
//! them and maps them onto the positional order the model was trained with.

pub mod aliases;
pub mod config;
pub mod feature_mapper;
pub mod feature_schema;
pub mod metrics;
pub mod models;
pub mod provision;
pub mod server;

pub use aliases::FeatureAliases;
pub use config::AppConfig;
pub use feature_mapper::{FeatureError, FeatureMapper, FeatureSet};
pub use feature_schema::FeatureSchema;
pub use models::inference::InferenceEngine;
pub use provision::ArtifactProvisioner;
pub use server::AppState;
