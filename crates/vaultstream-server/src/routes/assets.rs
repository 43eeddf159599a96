//! Asset lifecycle endpoints: originality verification, securing, and
//! deletion.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use vaultstream_core::{cipher, Asset, AssetId, OriginalityVerdict};
use vaultstream_store::AssetStore;

use crate::error::ApiError;
use crate::state::{AppState, AuthenticatedPrincipal};

async fn owned_asset(
    state: &AppState,
    id: &str,
    principal: &vaultstream_core::Principal,
) -> Result<Asset, ApiError> {
    let id: AssetId = id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid asset id".into()))?;
    let asset = state
        .assets
        .asset(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset {id}")))?;
    if asset.owner != principal.id {
        return Err(ApiError::Forbidden);
    }
    Ok(asset)
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verdict: OriginalityVerdict,
    pub message: &'static str,
}

/// PUT /assets/:id/verify
///
/// Runs the category's originality engine over the upload, stores the
/// normalized verdict, and registers verified-original content back into
/// the engine so later uploads are compared against it.
pub async fn verify_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<VerifyResponse>, ApiError> {
    let asset = owned_asset(&state, &id, &principal).await?;
    let upload = PathBuf::from(&asset.storage_path);

    let report = state
        .originality
        .check(&upload, asset.category)
        .await
        .map_err(|e| ApiError::Internal(format!("originality check failed: {e}")))?;

    let verdict = asset.category.normalize(&report);
    state.assets.set_originality(&asset.id, verdict).await?;
    tracing::info!(asset = %asset.id, ?verdict, "originality verdict stored");

    if verdict.is_original {
        // Registration failure must not lose the verdict; the engine can
        // be re-registered out of band.
        if let Err(e) = state
            .originality
            .register(&upload, asset.category, &asset.id)
            .await
        {
            tracing::warn!(asset = %asset.id, error = %e, "engine registration failed");
        }
    }

    Ok(Json(VerifyResponse {
        success: true,
        verdict,
        message: if verdict.is_original {
            "asset verified original"
        } else {
            "asset flagged as duplicate"
        },
    }))
}

/// PUT /assets/:id/secure
///
/// Encrypts the upload in place (`{storage_path}.enc`), pins the blob,
/// seals the key material, and removes the plaintext original. Requires
/// a true originality verdict. Idempotent once a content address is set.
pub async fn secure_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<Value>, ApiError> {
    let asset = owned_asset(&state, &id, &principal).await?;

    if !asset.originality.is_original {
        return Err(ApiError::NotVerified);
    }
    if asset.is_secured() {
        return Ok(Json(json!({
            "success": true,
            "cid": asset.cid,
            "message": "already secured",
        })));
    }

    let plaintext = PathBuf::from(&asset.storage_path);
    let encrypted = PathBuf::from(asset.encrypted_path());

    let enc_in = plaintext.clone();
    let enc_out = encrypted.clone();
    // encrypt_file removes its own partial output on failure.
    let material = tokio::task::spawn_blocking(move || cipher::encrypt_file(&enc_in, &enc_out))
        .await
        .map_err(|_| ApiError::EncryptionFailed("encrypt task aborted".into()))?
        .map_err(|e| ApiError::EncryptionFailed(e.to_string()))?;

    let cid = match state.pinner.pin(&encrypted).await {
        Ok(cid) => cid,
        Err(e) => {
            remove_quietly(&encrypted).await;
            return Err(ApiError::Internal(format!("pinning failed: {e}")));
        }
    };

    state.assets.seal(&asset.id, &material, &cid).await?;

    // The plaintext upload is no longer needed; the cache re-creates
    // working copies from the encrypted blob on demand.
    remove_quietly(&plaintext).await;

    tracing::info!(asset = %asset.id, %cid, "asset secured");
    Ok(Json(json!({ "success": true, "cid": cid })))
}

/// DELETE /assets/:id
///
/// Removes the record, the stored blobs, and the cached working copy.
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<StatusCode, ApiError> {
    let asset = owned_asset(&state, &id, &principal).await?;

    state.cache.invalidate(&asset).await?;
    remove_quietly(FsPath::new(&asset.storage_path)).await;
    remove_quietly(FsPath::new(&asset.encrypted_path())).await;
    state.assets.delete_asset(&asset.id).await?;

    tracing::info!(asset = %asset.id, "asset deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_quietly(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}
