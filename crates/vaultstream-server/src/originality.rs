//! Client for the per-category originality engines.
//!
//! Each content category is served by its own engine process. The client
//! uploads the file as multipart form data; raw reports are normalized
//! by the category's rules in `vaultstream-core`.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tokio_util::io::ReaderStream;

use vaultstream_core::{AssetId, ContentCategory, EngineReport};

/// Errors from the originality engine client.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No engine configured for this category.
    #[error("no originality engine for category: {0}")]
    NoEngine(ContentCategory),

    #[error("engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for the originality engines.
pub struct OriginalityClient {
    http: reqwest::Client,
    endpoints: HashMap<ContentCategory, String>,
}

impl OriginalityClient {
    pub fn new(endpoints: HashMap<ContentCategory, String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    fn endpoint(&self, category: ContentCategory) -> Result<&str, EngineError> {
        self.endpoints
            .get(&category)
            .map(String::as_str)
            .ok_or(EngineError::NoEngine(category))
    }

    async fn file_part(&self, path: &Path) -> Result<reqwest::multipart::Part, EngineError> {
        let file = tokio::fs::File::open(path).await?;
        let stream = ReaderStream::new(file);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(stream))
            .file_name(file_name))
    }

    /// Check a file against the category's engine, returning the raw
    /// report for normalization.
    pub async fn check(
        &self,
        path: &Path,
        category: ContentCategory,
    ) -> Result<EngineReport, EngineError> {
        let base = self.endpoint(category)?;
        let form = reqwest::multipart::Form::new().part("file", self.file_part(path).await?);

        let report = self
            .http
            .post(format!("{base}/check"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<EngineReport>()
            .await?;

        tracing::debug!(category = %category, ?report, "originality check completed");
        Ok(report)
    }

    /// Register a verified-original file with the category's engine so
    /// later uploads are compared against it.
    ///
    /// The asset id is passed under every key the engines accept.
    pub async fn register(
        &self,
        path: &Path,
        category: ContentCategory,
        asset_id: &AssetId,
    ) -> Result<(), EngineError> {
        let base = self.endpoint(category)?;
        let form = reqwest::multipart::Form::new()
            .part("file", self.file_part(path).await?)
            .text("content_id", asset_id.to_string())
            .text("label", asset_id.to_string())
            .text("id", asset_id.to_string());

        self.http
            .post(format!("{base}/register"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(category = %category, asset = %asset_id, "registered asset with engine");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_category_errors() {
        let client = OriginalityClient::new(HashMap::new());
        let err = client
            .check(Path::new("/tmp/x"), ContentCategory::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoEngine(ContentCategory::Audio)));
    }
}
