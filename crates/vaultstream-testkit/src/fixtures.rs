//! Test fixtures and helpers.
//!
//! Common setup code for crate and integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use vaultstream_auth::{AccessResolver, StaticLedger};
use vaultstream_core::{
    cipher, now_millis, Asset, AssetId, ContentCategory, GrantId, LicenseGrant, LicenseTerms,
    LicenseTier, OriginalityVerdict, Principal, PrincipalId, WalletAddress,
};
use vaultstream_store::{AssetStore, GrantStore, MemoryStore};

/// A test fixture with in-memory stores, a static ledger, and a temp
/// directory for blobs.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<StaticLedger>,
    pub dir: TempDir,
    counter: std::sync::atomic::AtomicU64,
}

impl TestFixture {
    /// Create a fresh fixture.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            ledger: Arc::new(StaticLedger::new()),
            dir: TempDir::new().expect("create temp dir"),
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Build a resolver over this fixture's store and ledger.
    pub fn resolver(&self) -> AccessResolver {
        AccessResolver::new(self.store.clone(), self.ledger.clone())
    }

    /// A principal with a deterministic-ish wallet.
    pub fn principal_with_wallet(&self) -> Principal {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut bytes = [0u8; 20];
        bytes[..8].copy_from_slice(&n.to_be_bytes());
        bytes[19] = 0x5f;
        Principal::with_wallet(PrincipalId::generate(), WalletAddress::from_bytes(bytes))
    }

    /// An asset record owned by `owner`, verified original and minted,
    /// not yet inserted into the store.
    pub fn make_asset(&self, owner: PrincipalId, category: ContentCategory) -> Asset {
        let id = AssetId::generate();
        let file_name = format!("{id}.{}", default_extension(category));
        Asset {
            id,
            owner,
            title: format!("asset {id}"),
            description: "fixture asset".into(),
            category,
            original_file_name: file_name.clone(),
            storage_path: self
                .dir
                .path()
                .join(file_name)
                .to_string_lossy()
                .into_owned(),
            cid: None,
            originality: OriginalityVerdict::new(true, 95),
            registration_id: Some("7".into()),
            license_terms: LicenseTerms::default(),
            created_at: now_millis(),
        }
    }

    /// Insert a verified video asset whose encrypted blob exists on disk
    /// and whose key material is sealed in the store.
    ///
    /// The plaintext upload is written, encrypted to `{path}.enc`, and
    /// then removed - the state an asset is in after securing.
    pub async fn secured_asset(&self, owner: PrincipalId, plaintext: &[u8]) -> Asset {
        self.secured_asset_in(owner, ContentCategory::Video, plaintext)
            .await
    }

    /// Like [`TestFixture::secured_asset`], for an arbitrary category.
    pub async fn secured_asset_in(
        &self,
        owner: PrincipalId,
        category: ContentCategory,
        plaintext: &[u8],
    ) -> Asset {
        let mut asset = self.make_asset(owner, category);

        let upload = PathBuf::from(&asset.storage_path);
        std::fs::write(&upload, plaintext).expect("write upload");

        let encrypted = PathBuf::from(asset.encrypted_path());
        let material = cipher::encrypt_file(&upload, &encrypted).expect("encrypt upload");
        std::fs::remove_file(&upload).expect("remove plaintext upload");

        self.store.insert_asset(&asset).await.expect("insert asset");
        self.store
            .seal(&asset.id, &material, "b3-fixture")
            .await
            .expect("seal asset");
        asset.cid = Some("b3-fixture".into());
        asset
    }

    /// Record an active grant for `(principal, asset)`.
    pub async fn grant(
        &self,
        principal: &Principal,
        asset: &Asset,
        expires_at: Option<i64>,
    ) -> LicenseGrant {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let grant = LicenseGrant {
            id: GrantId::generate(),
            principal: principal.id,
            asset: asset.id,
            transaction_ref: format!("0xfixture{n}"),
            tier: LicenseTier::Limited,
            issued_at: now_millis(),
            expires_at,
            active: true,
        };
        self.store.insert_grant(&grant).await.expect("insert grant");
        grant
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn default_extension(category: ContentCategory) -> &'static str {
    match category {
        ContentCategory::Video => "mp4",
        ContentCategory::Audio => "mp3",
        ContentCategory::Image => "png",
        ContentCategory::Text => "pdf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secured_asset_streams_back() {
        let fixture = TestFixture::new();
        let owner = PrincipalId::generate();
        let asset = fixture.secured_asset(owner, b"fixture plaintext").await;

        // The plaintext upload is gone; only the blob remains.
        assert!(!PathBuf::from(&asset.storage_path).exists());
        assert!(PathBuf::from(asset.encrypted_path()).exists());

        let material = fixture
            .store
            .key_material(&asset.id)
            .await
            .unwrap()
            .expect("sealed material");

        let out = fixture.dir.path().join("roundtrip.bin");
        cipher::decrypt_file(
            &PathBuf::from(asset.encrypted_path()),
            &out,
            &material,
        )
        .unwrap();
        assert_eq!(std::fs::read(out).unwrap(), b"fixture plaintext");
    }

    #[tokio::test]
    async fn test_fixture_wallets_are_distinct() {
        let fixture = TestFixture::new();
        let a = fixture.principal_with_wallet();
        let b = fixture.principal_with_wallet();
        assert_ne!(a.wallet, b.wallet);
    }
}
