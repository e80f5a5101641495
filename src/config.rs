//! Configuration management for the house price service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "HOUSE_PRICE_CONFIG";

/// Prefix for environment overrides, e.g. `HOUSE_PRICE__SERVER__PORT=9000`
const ENV_PREFIX: &str = "HOUSE_PRICE";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub models: ModelsConfig,
    pub features: FeaturesConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Local and remote locations of the model artifact and feature descriptor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Local path of the serialized ONNX regression model
    pub model_path: PathBuf,
    /// Local path of the feature-schema descriptor (JSON)
    pub schema_path: PathBuf,
    /// Remote URL the model is fetched from when absent locally
    pub model_url: Option<String>,
    /// Remote URL the descriptor is fetched from when absent locally
    pub schema_url: Option<String>,
    /// Timeout for a single artifact download
    pub download_timeout_secs: u64,
}

/// ONNX Runtime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Number of intra-op threads for the inference session
    pub onnx_threads: usize,
}

/// Transport-level feature naming
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Friendly alias -> canonical (training-time) feature name
    pub aliases: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Aliases for the columns of the Vietnamese housing dataset the model was trained on.
pub fn default_feature_aliases() -> HashMap<String, String> {
    [
        ("city_code", "City_Code"),
        ("district_code", "District_Code"),
        ("ward_code", "Ward_Code"),
        ("area", "Area"),
        ("frontage", "Frontage"),
        ("access_road", "Access Road"),
        ("house_direction", "House direction"),
        ("balcony_direction", "Balcony direction"),
        ("floors", "Floors"),
        ("bedrooms", "Bedrooms"),
        ("bathrooms", "Bathrooms"),
        ("legal_status", "Legal status"),
        ("furniture_state", "Furniture state"),
    ]
    .into_iter()
    .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
    .collect()
}

impl AppConfig {
    /// Load configuration from `$HOUSE_PRICE_CONFIG` or `config/config.toml`
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/config.toml".to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with environment overrides.
    ///
    /// The file is optional; anything it leaves out falls back to [`AppConfig::default`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            artifacts: ArtifactsConfig::default(),
            models: ModelsConfig::default(),
            features: FeaturesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/house_price_vn_rf.onnx"),
            schema_path: PathBuf::from("models/feature_columns.json"),
            model_url: None,
            schema_url: None,
            download_timeout_secs: 300,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            aliases: default_feature_aliases(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.features.aliases.len(), 13);
        assert!(config.artifacts.model_url.is_none());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8001");
    }

    #[test]
    fn test_default_aliases() {
        let aliases = default_feature_aliases();
        assert_eq!(aliases.get("access_road").map(String::as_str), Some("Access Road"));
        assert_eq!(aliases.get("legal_status").map(String::as_str), Some("Legal status"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[artifacts]
model_url = "https://models.example.com/house.onnx"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
        assert_eq!(
            config.artifacts.model_url.as_deref(),
            Some("https://models.example.com/house.onnx")
        );
        assert_eq!(config.artifacts.schema_path, PathBuf::from("models/feature_columns.json"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8001);
    }
}
