//! In-memory implementation of the store traits.
//!
//! Primarily for tests. Same semantics as SQLite but nothing persists.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use vaultstream_core::{
    Asset, AssetId, GrantId, KeyMaterial, LicenseGrant, OriginalityVerdict, PrincipalId,
};

use crate::error::{Result, StoreError};
use crate::traits::{AssetFilter, AssetStore, GrantInsert, GrantStore};

/// In-memory store implementing both [`AssetStore`] and [`GrantStore`].
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    assets: HashMap<AssetId, Asset>,

    /// Key material, kept apart from the asset records so that nothing
    /// hands it out by accident.
    keys: HashMap<AssetId, KeyMaterial>,

    grants: Vec<LicenseGrant>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().expect("memory store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn insert_asset(&self, asset: &Asset) -> Result<()> {
        self.write().assets.insert(asset.id, asset.clone());
        Ok(())
    }

    async fn asset(&self, id: &AssetId) -> Result<Option<Asset>> {
        Ok(self.read().assets.get(id).cloned())
    }

    async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>> {
        let inner = self.read();
        let mut assets: Vec<Asset> = inner
            .assets
            .values()
            .filter(|a| !filter.verified_only || a.originality.is_original)
            .cloned()
            .collect();
        assets.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        Ok(assets)
    }

    async fn set_originality(&self, id: &AssetId, verdict: OriginalityVerdict) -> Result<()> {
        let mut inner = self.write();
        let asset = inner
            .assets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        asset.originality = verdict;
        Ok(())
    }

    async fn set_registration(&self, id: &AssetId, registration_id: &str) -> Result<()> {
        let mut inner = self.write();
        let asset = inner
            .assets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        asset.registration_id = Some(registration_id.to_string());
        Ok(())
    }

    async fn seal(&self, id: &AssetId, material: &KeyMaterial, cid: &str) -> Result<()> {
        let mut inner = self.write();
        if !inner.assets.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if inner.keys.contains_key(id) {
            return Err(StoreError::SealViolation(id.to_string()));
        }
        inner.keys.insert(*id, material.clone());
        if let Some(asset) = inner.assets.get_mut(id) {
            asset.cid = Some(cid.to_string());
        }
        Ok(())
    }

    async fn key_material(&self, id: &AssetId) -> Result<Option<KeyMaterial>> {
        Ok(self.read().keys.get(id).cloned())
    }

    async fn delete_asset(&self, id: &AssetId) -> Result<()> {
        let mut inner = self.write();
        inner.assets.remove(id);
        inner.keys.remove(id);
        inner.grants.retain(|g| g.asset != *id);
        Ok(())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn insert_grant(&self, grant: &LicenseGrant) -> Result<GrantInsert> {
        let mut inner = self.write();
        if inner
            .grants
            .iter()
            .any(|g| g.transaction_ref == grant.transaction_ref)
        {
            return Ok(GrantInsert::DuplicateTransaction);
        }
        inner.grants.push(grant.clone());
        Ok(GrantInsert::Inserted)
    }

    async fn active_grants(
        &self,
        principal: &PrincipalId,
        asset: &AssetId,
    ) -> Result<Vec<LicenseGrant>> {
        let inner = self.read();
        let mut grants: Vec<LicenseGrant> = inner
            .grants
            .iter()
            .filter(|g| g.active && g.principal == *principal && g.asset == *asset)
            .cloned()
            .collect();
        grants.sort_by_key(|g| std::cmp::Reverse(g.issued_at));
        Ok(grants)
    }

    async fn grants_for_principal(&self, principal: &PrincipalId) -> Result<Vec<LicenseGrant>> {
        let inner = self.read();
        let mut grants: Vec<LicenseGrant> = inner
            .grants
            .iter()
            .filter(|g| g.principal == *principal)
            .cloned()
            .collect();
        grants.sort_by_key(|g| std::cmp::Reverse(g.issued_at));
        Ok(grants)
    }

    async fn deactivate_grant(&self, grant: &GrantId) -> Result<()> {
        let mut inner = self.write();
        match inner.grants.iter_mut().find(|g| g.id == *grant) {
            Some(g) => {
                g.active = false;
                Ok(())
            }
            None => Err(StoreError::NotFound(grant.to_string())),
        }
    }
}
