//! Store traits: the abstract interfaces for asset and grant persistence.
//!
//! These traits keep the delivery pipeline storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use vaultstream_core::{
    Asset, AssetId, GrantId, KeyMaterial, LicenseGrant, OriginalityVerdict, PrincipalId,
};

use crate::error::Result;

/// Result of recording a license grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantInsert {
    /// Grant was recorded.
    Inserted,
    /// A grant with this transaction reference already exists. A
    /// transaction may produce at most one grant, so this is rejected
    /// rather than duplicated.
    DuplicateTransaction,
}

/// Listing filter for assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetFilter {
    /// Only include assets with a true originality verdict. This is the
    /// marketplace default; unverified assets are visible only to their
    /// owners.
    pub verified_only: bool,
}

/// Async interface for asset persistence.
///
/// # Design Notes
///
/// - **Key material never rides along**: [`Asset`] carries no key or IV.
///   [`AssetStore::key_material`] is the single, explicit read path.
/// - **Seal-once**: key material and content address are written together
///   by [`AssetStore::seal`] and are immutable afterwards.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Insert a new asset record.
    async fn insert_asset(&self, asset: &Asset) -> Result<()>;

    /// Get an asset by id.
    async fn asset(&self, id: &AssetId) -> Result<Option<Asset>>;

    /// List assets, newest first.
    async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>>;

    /// Store the normalized originality verdict for an asset.
    async fn set_originality(&self, id: &AssetId, verdict: OriginalityVerdict) -> Result<()>;

    /// Record the on-chain registration id once the asset is minted.
    async fn set_registration(&self, id: &AssetId, registration_id: &str) -> Result<()>;

    /// Seal key material and content address onto an asset.
    ///
    /// This happens exactly once, at securing time. Returns
    /// [`crate::StoreError::SealViolation`] if the asset already has key
    /// material, and `NotFound` if the asset does not exist.
    async fn seal(&self, id: &AssetId, material: &KeyMaterial, cid: &str) -> Result<()>;

    /// Fetch the sealed key material for an asset.
    ///
    /// Returns `None` for an unsecured asset. This is the only read that
    /// exposes key material.
    async fn key_material(&self, id: &AssetId) -> Result<Option<KeyMaterial>>;

    /// Delete an asset and its key material.
    async fn delete_asset(&self, id: &AssetId) -> Result<()>;
}

/// Async interface for license-grant persistence.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Record a grant.
    ///
    /// Idempotence key is the transaction reference: recording the same
    /// transaction twice returns [`GrantInsert::DuplicateTransaction`].
    async fn insert_grant(&self, grant: &LicenseGrant) -> Result<GrantInsert>;

    /// All *active* grants for `(principal, asset)`, newest first.
    ///
    /// Expiry is not evaluated here; the resolver applies its own clock.
    async fn active_grants(
        &self,
        principal: &PrincipalId,
        asset: &AssetId,
    ) -> Result<Vec<LicenseGrant>>;

    /// All grants held by a principal, newest first.
    async fn grants_for_principal(&self, principal: &PrincipalId) -> Result<Vec<LicenseGrant>>;

    /// Deactivate a grant (e.g., refunded or revoked upstream).
    async fn deactivate_grant(&self, grant: &GrantId) -> Result<()>;
}
