//! Artifact provisioning.
//!
//! Makes sure the feature descriptor and the model artifact are on local disk
//! before anything is loaded, streaming them from their configured URLs when
//! they are missing. Downloads land in a `.part` file that is renamed into
//! place only after the body has been fully written, so an interrupted or
//! rejected download never leaves a file at the artifact path.

use crate::config::ArtifactsConfig;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{kind} not found at {} and no download URL is configured", .path.display())]
    MissingArtifact { kind: &'static str, path: PathBuf },

    #[error("failed to download {kind} from {url}: {reason}")]
    Download {
        kind: &'static str,
        url: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of [`ArtifactProvisioner::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// One-shot startup fetcher for missing artifacts
pub struct ArtifactProvisioner {
    client: reqwest::Client,
    config: ArtifactsConfig,
}

impl ArtifactProvisioner {
    pub fn new(config: &ArtifactsConfig) -> Result<Self, ProvisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Ensure the feature descriptor, then the model artifact
    pub async fn provision(&self) -> Result<(), ProvisionError> {
        self.ensure(
            "feature descriptor",
            &self.config.schema_path,
            self.config.schema_url.as_deref(),
        )
        .await?;
        self.ensure(
            "model artifact",
            &self.config.model_path,
            self.config.model_url.as_deref(),
        )
        .await?;
        Ok(())
    }

    /// Ensure `path` exists, downloading it from `url` if it does not
    pub async fn ensure(
        &self,
        kind: &'static str,
        path: &Path,
        url: Option<&str>,
    ) -> Result<Provisioned, ProvisionError> {
        if path.exists() {
            info!(artifact = kind, path = %path.display(), "Artifact present locally");
            return Ok(Provisioned::AlreadyPresent);
        }

        let url = url.ok_or_else(|| ProvisionError::MissingArtifact {
            kind,
            path: path.to_path_buf(),
        })?;

        info!(artifact = kind, url = %url, path = %path.display(), "Artifact missing, downloading");

        let partial = partial_path(path);
        match self.download(url, path, &partial).await {
            Ok(bytes) => {
                info!(artifact = kind, path = %path.display(), bytes = bytes, "Artifact downloaded");
                Ok(Provisioned::Downloaded { bytes })
            }
            Err(reason) => {
                if partial.exists() {
                    if let Err(e) = std::fs::remove_file(&partial) {
                        error!(path = %partial.display(), error = %e, "Failed to remove partial download");
                    }
                }
                error!(artifact = kind, url = %url, reason = %reason, "Artifact download failed");
                Err(ProvisionError::Download {
                    kind,
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }

    async fn download(&self, url: &str, path: &Path, partial: &Path) -> Result<u64, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server responded with {status}"));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
        }

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| format!("cannot create {}: {e}", partial.display()))?;

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| format!("body read failed after {written} bytes: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write failed: {e}"))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| format!("flush failed: {e}"))?;
        file.sync_all().await.map_err(|e| format!("sync failed: {e}"))?;
        drop(file);

        tokio::fs::rename(partial, path)
            .await
            .map_err(|e| format!("cannot move download into place: {e}"))?;

        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    /// Serve a tiny fixed set of routes on an ephemeral port.
    async fn spawn_artifact_server() -> String {
        let app = Router::new()
            .route("/model.onnx", get(|| async { vec![7u8; 64 * 1024] }))
            .route(
                "/feature_columns.json",
                get(|| async { r#"{"City_Code": "City_Code", "Area": "Area"}"# }),
            )
            .route(
                "/broken.onnx",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provisioner(dir: &Path, model_url: Option<String>, schema_url: Option<String>) -> ArtifactProvisioner {
        let config = ArtifactsConfig {
            model_path: dir.join("models/house.onnx"),
            schema_path: dir.join("models/feature_columns.json"),
            model_url,
            schema_url,
            download_timeout_secs: 10,
        };
        ArtifactProvisioner::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_downloads_missing_artifacts() {
        let base = spawn_artifact_server().await;
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(
            dir.path(),
            Some(format!("{base}/model.onnx")),
            Some(format!("{base}/feature_columns.json")),
        );

        provisioner.provision().await.unwrap();

        let model = std::fs::read(dir.path().join("models/house.onnx")).unwrap();
        assert_eq!(model.len(), 64 * 1024);
        let schema = std::fs::read_to_string(dir.path().join("models/feature_columns.json")).unwrap();
        assert!(schema.contains("City_Code"));
        assert!(!dir.path().join("models/house.onnx.part").exists());
    }

    #[tokio::test]
    async fn test_existing_artifact_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.onnx");
        std::fs::write(&path, b"local").unwrap();

        // Port 9 (discard) is never contacted because the file already exists.
        let provisioner = provisioner(dir.path(), None, None);
        let outcome = provisioner
            .ensure("model artifact", &path, Some("http://127.0.0.1:9/house.onnx"))
            .await
            .unwrap();

        assert_eq!(outcome, Provisioned::AlreadyPresent);
        assert_eq!(std::fs::read(&path).unwrap(), b"local");
    }

    #[tokio::test]
    async fn test_non_success_status_aborts_without_partial_file() {
        let base = spawn_artifact_server().await;
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(dir.path(), None, None);
        let path = dir.path().join("house.onnx");

        let err = provisioner
            .ensure("model artifact", &path, Some(format!("{base}/broken.onnx").as_str()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(err.to_string().contains("500"));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn test_not_found_aborts_without_partial_file() {
        let base = spawn_artifact_server().await;
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(dir.path(), Some(format!("{base}/missing.onnx")), None);
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/feature_columns.json"), "[\"Area\"]").unwrap();

        let err = provisioner.provision().await.unwrap_err();
        assert!(matches!(err, ProvisionError::Download { kind: "model artifact", .. }));
        assert!(!dir.path().join("models/house.onnx").exists());
        assert!(!dir.path().join("models/house.onnx.part").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(dir.path(), None, None);

        let err = provisioner.provision().await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::MissingArtifact { kind: "feature descriptor", .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(dir.path(), None, None);
        let path = dir.path().join("house.onnx");

        let err = provisioner
            .ensure("model artifact", &path, Some("http://127.0.0.1:1/house.onnx"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("models/house.onnx")),
            PathBuf::from("models/house.onnx.part")
        );
    }
}
