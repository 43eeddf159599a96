//! The stream endpoint: range-capable delivery of decrypted bytes.
//!
//! Request lifecycle: authorize, materialize through the shared cache,
//! then serve - either the whole file (200), the requested byte span
//! (206), or the watermark filter's output (200, non-seekable).

use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use vaultstream_auth::Decision;
use vaultstream_core::{media, Asset, AssetId, Principal};
use vaultstream_store::AssetStore;

use crate::cache::CacheError;
use crate::error::ApiError;
use crate::state::{AppState, AuthenticatedPrincipal};

/// Chunk size for response bodies; bounds per-request buffering.
const STREAM_CHUNK: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub watermark: bool,
}

/// GET /assets/:id/stream
pub async fn stream_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StreamParams>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id: AssetId = id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid asset id".into()))?;
    let asset = state
        .assets
        .asset(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset {id}")))?;

    match state.resolver.authorize(&principal, &asset).await {
        Decision::Allowed(path) => {
            tracing::debug!(asset = %asset.id, principal = %principal.id, ?path, "stream authorized");
        }
        Decision::Denied(reason) => return Err(ApiError::Denied(reason)),
    }

    let material = state
        .assets
        .key_material(&asset.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset {id} is not secured")))?;

    let plaintext = match state.cache.materialize(&asset, &material).await {
        Ok(path) => path,
        Err(CacheError::SourceBlobMissing(path)) => {
            return Err(ApiError::SourceBlobMissing(path.display().to_string()))
        }
        Err(CacheError::DecryptionFailed(e)) => return Err(ApiError::DecryptionFailed(e.to_string())),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    if params.watermark && asset.category.supports_watermark() {
        return watermark_response(&state, &asset, &principal, &plaintext);
    }

    let size = tokio::fs::metadata(&plaintext).await?.len();
    let content_type = asset.category.resolve_mime(&asset.original_file_name);

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|raw| parse_range(raw, size))
        .transpose()?
        .flatten();

    match range {
        Some((start, end)) => {
            let mut file = tokio::fs::File::open(&plaintext).await?;
            file.seek(SeekFrom::Start(start)).await?;
            let span = file.take(end - start + 1);

            let response = Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{size}"))
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, end - start + 1)
                .header("cross-origin-resource-policy", "cross-origin")
                .body(Body::from_stream(ReaderStream::with_capacity(
                    span,
                    STREAM_CHUNK,
                )))
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(response)
        }
        None => {
            let file = tokio::fs::File::open(&plaintext).await?;
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, size)
                .header(header::ACCEPT_RANGES, "bytes")
                .header("cross-origin-resource-policy", "cross-origin")
                .body(Body::from_stream(ReaderStream::with_capacity(
                    file,
                    STREAM_CHUNK,
                )))
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(response)
        }
    }
}

/// Serve the watermark filter's output.
///
/// The filter re-encodes, so the length is unknown up front: no
/// Content-Length, no Accept-Ranges, content type pinned to the
/// transform's output format. A filter that cannot start rejects the
/// request; the stream is never silently downgraded to unwatermarked.
fn watermark_response(
    state: &AppState,
    asset: &Asset,
    principal: &Principal,
    plaintext: &std::path::Path,
) -> Result<Response, ApiError> {
    let licensee = principal
        .wallet
        .map(|w| w.short())
        .unwrap_or_else(|| principal.id.to_string());

    let stdout = state
        .watermarker
        .stream(plaintext, &licensee)
        .map_err(|e| ApiError::TransformUnavailable(e.to_string()))?;

    tracing::debug!(asset = %asset.id, "serving watermarked stream");
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media::WATERMARK_MIME)
        .header("cross-origin-resource-policy", "cross-origin")
        .body(Body::from_stream(ReaderStream::with_capacity(
            stdout,
            STREAM_CHUNK,
        )))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Parse a `bytes=start-end` range header against a file of `size` bytes.
///
/// `end` defaults to, and is clamped to, `size - 1`. A start beyond the
/// end of the file is unsatisfiable. Headers in units other than bytes
/// are ignored (full response), malformed ones are a client error.
fn parse_range(raw: &str, size: u64) -> Result<Option<(u64, u64)>, ApiError> {
    let Some(spec) = raw.strip_prefix("bytes=") else {
        return Ok(None);
    };
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| ApiError::BadRequest(format!("malformed range: {raw}")))?;

    let start: u64 = start
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("malformed range: {raw}")))?;
    let end: u64 = match end.trim() {
        "" => size.saturating_sub(1),
        val => val
            .parse::<u64>()
            .map_err(|_| ApiError::BadRequest(format!("malformed range: {raw}")))?
            .min(size.saturating_sub(1)),
    };

    if size == 0 || start >= size || start > end {
        return Err(ApiError::RangeNotSatisfiable { size });
    }
    Ok(Some((start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_explicit() {
        assert_eq!(parse_range("bytes=0-99", 1000).unwrap(), Some((0, 99)));
        assert_eq!(parse_range("bytes=500-999", 1000).unwrap(), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_open_ended() {
        assert_eq!(parse_range("bytes=900-", 1000).unwrap(), Some((900, 999)));
        assert_eq!(parse_range("bytes=0-", 1).unwrap(), Some((0, 0)));
    }

    #[test]
    fn test_parse_range_end_clamped_to_size() {
        assert_eq!(parse_range("bytes=0-5000", 1000).unwrap(), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert!(matches!(
            parse_range("bytes=1000-", 1000).unwrap_err(),
            ApiError::RangeNotSatisfiable { size: 1000 }
        ));
        assert!(matches!(
            parse_range("bytes=5-2", 1000).unwrap_err(),
            ApiError::RangeNotSatisfiable { .. }
        ));
        assert!(matches!(
            parse_range("bytes=0-", 0).unwrap_err(),
            ApiError::RangeNotSatisfiable { size: 0 }
        ));
    }

    #[test]
    fn test_parse_range_other_units_ignored() {
        assert_eq!(parse_range("items=0-5", 1000).unwrap(), None);
    }

    #[test]
    fn test_parse_range_malformed() {
        assert!(matches!(
            parse_range("bytes=abc-def", 1000).unwrap_err(),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            parse_range("bytes=42", 1000).unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }
}
