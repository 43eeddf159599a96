//! The decrypted-artifact cache.
//!
//! An encrypted asset is materialized into a plaintext working copy at
//! most once, then shared by every subsequent reader. Creation of an
//! entry is serialized per asset id; reads of an existing entry take no
//! lock beyond the map lookup. Streaming never holds any cache lock.
//!
//! Entries persist until explicitly invalidated (asset deletion). There
//! is no TTL: the cache grows with the set of streamed assets, and an
//! operator reclaims space by clearing the cache directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::OnceCell;

use vaultstream_core::{cipher, Asset, AssetId, CoreError, KeyMaterial};

/// Errors from cache materialization.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The encrypted source blob is not on disk.
    #[error("encrypted source blob missing: {0}")]
    SourceBlobMissing(PathBuf),

    /// Decryption failed; any partial output has been removed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decrypt task aborted")]
    TaskAborted,
}

/// Process-wide cache of decrypted working copies, keyed by asset id.
pub struct ArtifactCache {
    dir: PathBuf,

    /// One init cell per asset. The mutex guards only the map; the cell
    /// serializes creation of the entry it guards.
    entries: Mutex<HashMap<AssetId, Arc<OnceCell<PathBuf>>>>,

    /// Number of actual decryption passes performed.
    passes: AtomicU64,
}

impl ArtifactCache {
    /// Create a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            entries: Mutex::new(HashMap::new()),
            passes: AtomicU64::new(0),
        })
    }

    /// Canonical plaintext path for an asset.
    pub fn entry_path(&self, asset: &Asset) -> PathBuf {
        self.dir
            .join(format!("stream-{}{}", asset.id, asset.extension()))
    }

    /// Materialize the plaintext working copy for `asset`.
    ///
    /// Returns the existing copy when present; otherwise decrypts the
    /// asset's blob into place. Concurrent first accesses coalesce into a
    /// single decryption pass. A failed pass leaves the cell empty so a
    /// later request can retry, and never leaves a partial file claimed
    /// as valid.
    pub async fn materialize(
        &self,
        asset: &Asset,
        material: &KeyMaterial,
    ) -> Result<PathBuf, CacheError> {
        let cell = {
            let mut entries = self.entries.lock().expect("cache lock poisoned");
            entries
                .entry(asset.id)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let path = cell
            .get_or_try_init(|| self.decrypt_into_place(asset, material))
            .await?;
        Ok(path.clone())
    }

    async fn decrypt_into_place(
        &self,
        asset: &Asset,
        material: &KeyMaterial,
    ) -> Result<PathBuf, CacheError> {
        let target = self.entry_path(asset);

        // A copy from an earlier process lifetime is just as good.
        if tokio::fs::try_exists(&target).await? {
            tracing::debug!(asset = %asset.id, "reusing on-disk working copy");
            return Ok(target);
        }

        let source = PathBuf::from(asset.encrypted_path());
        if !tokio::fs::try_exists(&source).await? {
            return Err(CacheError::SourceBlobMissing(source));
        }

        let material = material.clone();
        let out = target.clone();
        tokio::task::spawn_blocking(move || cipher::decrypt_file(&source, &out, &material))
            .await
            .map_err(|_| CacheError::TaskAborted)?
            .map_err(CacheError::DecryptionFailed)?;

        self.passes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(asset = %asset.id, path = %target.display(), "materialized working copy");
        Ok(target)
    }

    /// Drop the cache entry for `asset` and unlink its working copy.
    ///
    /// The invalidation hook for asset deletion and key rotation.
    pub async fn invalidate(&self, asset: &Asset) -> std::io::Result<()> {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(&asset.id);

        let path = self.entry_path(asset);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Number of decryption passes performed so far.
    pub fn decrypt_passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstream_core::{
        AssetId, ContentCategory, LicenseTerms, OriginalityVerdict, PrincipalId,
    };

    fn asset_with_blob(dir: &Path, plaintext: &[u8]) -> (Asset, KeyMaterial) {
        let asset_id = AssetId::generate();
        let storage_path = dir.join(format!("{asset_id}.mp4"));
        std::fs::write(&storage_path, plaintext).unwrap();

        let enc_path = dir.join(format!("{asset_id}.mp4.enc"));
        let material = cipher::encrypt_file(&storage_path, &enc_path).unwrap();

        let asset = Asset {
            id: asset_id,
            owner: PrincipalId::generate(),
            title: "t".into(),
            description: "d".into(),
            category: ContentCategory::Video,
            original_file_name: "clip.mp4".into(),
            storage_path: storage_path.to_string_lossy().into_owned(),
            cid: Some("b3-test".into()),
            originality: OriginalityVerdict::new(true, 90),
            registration_id: None,
            license_terms: LicenseTerms::default(),
            created_at: 0,
        };
        (asset, material)
    }

    #[tokio::test]
    async fn test_materialize_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let (asset, material) = asset_with_blob(dir.path(), b"plaintext bytes");

        let path = cache.materialize(&asset, &material).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"plaintext bytes");
        assert_eq!(cache.decrypt_passes(), 1);

        // Second call reuses the entry.
        let again = cache.materialize(&asset, &material).await.unwrap();
        assert_eq!(again, path);
        assert_eq!(cache.decrypt_passes(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_materialize_single_pass() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ArtifactCache::new(dir.path().join("cache")).unwrap());
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
        let (asset, material) = asset_with_blob(dir.path(), &data);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let asset = asset.clone();
            let material = material.clone();
            handles.push(tokio::spawn(async move {
                cache.materialize(&asset, &material).await.unwrap()
            }));
        }

        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.unwrap());
        }

        paths.dedup();
        assert_eq!(paths.len(), 1);
        assert_eq!(cache.decrypt_passes(), 1);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), data);
    }

    #[tokio::test]
    async fn test_missing_source_blob() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let (mut asset, material) = asset_with_blob(dir.path(), b"x");
        std::fs::remove_file(asset.encrypted_path()).unwrap();
        asset.cid = Some("b3-gone".into());

        let err = cache.materialize(&asset, &material).await.unwrap_err();
        assert!(matches!(err, CacheError::SourceBlobMissing(_)));
    }

    #[tokio::test]
    async fn test_failed_decrypt_leaves_no_partial_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let (asset, material) = asset_with_blob(dir.path(), b"real content here");

        // Corrupt the blob: truncated to a non-block length.
        let good = std::fs::read(asset.encrypted_path()).unwrap();
        std::fs::write(asset.encrypted_path(), &good[..good.len() - 3]).unwrap();

        let err = cache.materialize(&asset, &material).await.unwrap_err();
        assert!(matches!(err, CacheError::DecryptionFailed(_)));
        assert!(!cache.entry_path(&asset).exists());

        // Restore the blob; the cell must not be poisoned.
        std::fs::write(asset.encrypted_path(), &good).unwrap();
        let path = cache.materialize(&asset, &material).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"real content here");
    }

    #[tokio::test]
    async fn test_invalidate_unlinks_and_allows_redecrypt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache")).unwrap();
        let (asset, material) = asset_with_blob(dir.path(), b"short lived");

        let path = cache.materialize(&asset, &material).await.unwrap();
        assert!(path.exists());

        cache.invalidate(&asset).await.unwrap();
        assert!(!path.exists());

        // Invalidating an absent entry is fine.
        cache.invalidate(&asset).await.unwrap();

        cache.materialize(&asset, &material).await.unwrap();
        assert_eq!(cache.decrypt_passes(), 2);
    }
}
