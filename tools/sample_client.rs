//! Sample Prediction Client
//!
//! Generates plausible property feature sets and sends them to a running
//! service's `/predict` endpoint, logging the returned prices.
//!
//! Usage: sample-client [base_url] [count] [alias_rate] [delay_ms]

use anyhow::{Context, Result};
use house_price_service::config::default_feature_aliases;
use house_price_service::server::{PredictResponse, SchemaResponse};
use house_price_service::FeatureAliases;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// One listing, serialized with the canonical training column names
#[derive(Debug, Clone, Serialize)]
struct HouseFeatures {
    #[serde(rename = "City_Code")]
    city_code: f64,
    #[serde(rename = "District_Code")]
    district_code: f64,
    #[serde(rename = "Ward_Code")]
    ward_code: f64,
    #[serde(rename = "Area")]
    area: f64,
    #[serde(rename = "Frontage")]
    frontage: f64,
    #[serde(rename = "Access Road")]
    access_road: f64,
    #[serde(rename = "House direction")]
    house_direction: f64,
    #[serde(rename = "Balcony direction")]
    balcony_direction: f64,
    #[serde(rename = "Floors")]
    floors: f64,
    #[serde(rename = "Bedrooms")]
    bedrooms: f64,
    #[serde(rename = "Bathrooms")]
    bathrooms: f64,
    #[serde(rename = "Legal status")]
    legal_status: f64,
    #[serde(rename = "Furniture state")]
    furniture_state: f64,
}

/// Random listing generator
struct ListingGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ListingGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn generate(&mut self) -> HouseFeatures {
        let bedrooms = self.rng.gen_range(1..6) as f64;

        HouseFeatures {
            city_code: self.rng.gen_range(0..63) as f64,
            district_code: self.rng.gen_range(0..700) as f64,
            ward_code: self.rng.gen_range(0..10000) as f64,
            area: (self.rng.gen_range(25.0..250.0_f64) * 10.0).round() / 10.0,
            frontage: (self.rng.gen_range(3.0..12.0_f64) * 10.0).round() / 10.0,
            access_road: (self.rng.gen_range(2.0..20.0_f64) * 10.0).round() / 10.0,
            house_direction: self.rng.gen_range(0..8) as f64,
            balcony_direction: self.rng.gen_range(0..8) as f64,
            floors: self.rng.gen_range(1..6) as f64,
            bedrooms,
            bathrooms: (bedrooms - self.rng.gen_range(0..2) as f64).max(1.0),
            legal_status: self.rng.gen_range(0..3) as f64,
            furniture_state: self.rng.gen_range(0..3) as f64,
        }
    }
}

/// Swap canonical keys for their friendly aliases
fn with_aliases(features: Value, aliases: &FeatureAliases) -> Value {
    let Value::Object(map) = features else {
        return features;
    };
    let renamed: Map<String, Value> = map
        .into_iter()
        .map(|(name, value)| {
            let key = aliases.alias_for(&name).map(str::to_string).unwrap_or(name);
            (key, value)
        })
        .collect();
    Value::Object(renamed)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_client=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let base_url = args.get(1).map(|s| s.as_str()).unwrap_or("http://localhost:8001");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let alias_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.5);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        alias_rate = alias_rate,
        delay_ms = delay_ms,
        "Starting sample prediction client"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let schema: SchemaResponse = client
        .get(format!("{base_url}/schema"))
        .send()
        .await
        .context("Service unreachable")?
        .error_for_status()?
        .json()
        .await?;
    info!(features = ?schema.features, "Service feature order");

    let aliases = FeatureAliases::new(default_feature_aliases())?;
    let mut generator = ListingGenerator::new();
    let mut rng = rand::thread_rng();
    let mut prices = Vec::with_capacity(count as usize);

    for i in 0..count {
        let mut features = serde_json::to_value(generator.generate())?;
        let aliased = rng.gen_bool(alias_rate.clamp(0.0, 1.0));
        if aliased {
            features = with_aliases(features, &aliases);
        }

        let response = client
            .post(format!("{base_url}/predict"))
            .json(&json!({ "features": features }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let prediction: PredictResponse = response.json().await?;
            info!(
                request = i + 1,
                aliased = aliased,
                predicted_price = prediction.predicted_price,
                "Prediction received"
            );
            prices.push(prediction.predicted_price);
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(request = i + 1, status = %status, body = %body, "Prediction rejected");
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    if !prices.is_empty() {
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        info!(
            succeeded = prices.len(),
            requested = count,
            mean_price = mean,
            "Completed"
        );
    } else {
        warn!(requested = count, "No predictions succeeded");
    }

    Ok(())
}
