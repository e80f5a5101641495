//! House Price Inference Service - Main Entry Point
//!
//! Provisions the model artifacts, loads the feature schema and model, and
//! serves predictions over HTTP.

use anyhow::{Context, Result};
use house_price_service::{
    config::{AppConfig, LoggingConfig},
    server, AppState, ArtifactProvisioner, FeatureAliases, FeatureSchema, InferenceEngine,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting House Price Inference Service");

    // Make sure the descriptor and the model are on disk before loading anything
    let provisioner = ArtifactProvisioner::new(&config.artifacts)?;
    provisioner
        .provision()
        .await
        .context("Artifact provisioning failed")?;

    let schema = Arc::new(
        FeatureSchema::load(&config.artifacts.schema_path).context("Failed to load feature schema")?,
    );
    info!(features = ?schema.feature_order(), "Feature order fixed for this process");

    let aliases = FeatureAliases::new(config.features.aliases.clone())
        .context("Invalid feature alias table")?;
    aliases
        .validate(&schema)
        .context("Feature alias table conflicts with the feature schema")?;
    for (alias, canonical) in aliases.unmatched(&schema) {
        warn!(alias = %alias, canonical = %canonical, "Alias refers to a feature the model does not use");
    }

    let engine = InferenceEngine::from_artifact(
        &config.artifacts.model_path,
        schema.len(),
        config.models.onnx_threads,
    )
    .context("Failed to load model")?;

    let state = Arc::new(AppState::new(schema, aliases, engine));
    let metrics = state.metrics.clone();

    server::run_server(state, &config.server).await?;

    metrics.print_summary();
    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}
