//! Application state shared across handlers

use std::sync::Arc;

use crate::aliases::FeatureAliases;
use crate::feature_mapper::FeatureMapper;
use crate::feature_schema::FeatureSchema;
use crate::metrics::ServiceMetrics;
use crate::models::InferenceEngine;

/// Everything a request needs, built once at startup and never mutated.
pub struct AppState {
    pub schema: Arc<FeatureSchema>,
    pub aliases: FeatureAliases,
    pub mapper: FeatureMapper,
    pub engine: InferenceEngine,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(schema: Arc<FeatureSchema>, aliases: FeatureAliases, engine: InferenceEngine) -> Self {
        Self {
            mapper: FeatureMapper::new(schema.clone()),
            schema,
            aliases,
            engine,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}
