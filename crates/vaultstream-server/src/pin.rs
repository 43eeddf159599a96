//! Blob pinning: durable storage of the encrypted artifact.
//!
//! The pipeline only needs the pin to yield a content address to record
//! on the asset. [`LocalPinner`] content-addresses into a local
//! directory; [`RemotePinner`] hands the blob to a pinning service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::io::ReaderStream;

/// Errors from pinning.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pinning service error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("pinning service returned no hash")]
    MissingHash,

    #[error("pin task aborted")]
    TaskAborted,
}

/// Pins an encrypted blob and returns its content address.
#[async_trait]
pub trait BlobPinner: Send + Sync {
    async fn pin(&self, path: &Path) -> Result<String, PinError>;
}

/// Content-addresses blobs into a local directory. The dev/demo
/// fallback when no pinning service is configured.
pub struct LocalPinner {
    dir: PathBuf,
}

impl LocalPinner {
    /// Create a pinner rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl BlobPinner for LocalPinner {
    async fn pin(&self, path: &Path) -> Result<String, PinError> {
        let source = path.to_path_buf();
        let dir = self.dir.clone();

        // Hash + copy are file-bound; run on the blocking pool.
        let cid = tokio::task::spawn_blocking(move || -> Result<String, PinError> {
            let mut hasher = blake3::Hasher::new();
            hasher.update_reader(std::fs::File::open(&source)?)?;
            let cid = hasher.finalize().to_hex().to_string();
            std::fs::copy(&source, dir.join(&cid))?;
            Ok(cid)
        })
        .await
        .map_err(|_| PinError::TaskAborted)??;

        tracing::info!(%cid, "pinned blob locally");
        Ok(cid)
    }
}

/// Hands blobs to a remote pinning service over multipart HTTP.
pub struct RemotePinner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    hash: Option<String>,
}

impl RemotePinner {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl BlobPinner for RemotePinner {
    async fn pin(&self, path: &Path) -> Result<String, PinError> {
        let file = tokio::fs::File::open(path).await?;
        let stream = ReaderStream::new(file);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blob".to_string());
        let part =
            reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(stream)).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response: PinResponse = self
            .http
            .post(&self.endpoint)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let cid = response.hash.ok_or(PinError::MissingHash)?;
        tracing::info!(%cid, "pinned blob remotely");
        Ok(cid)
    }
}
