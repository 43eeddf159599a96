//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite behind a mutex; operations are short, indexed queries.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use vaultstream_core::{
    Asset, AssetId, ContentCategory, GrantId, KeyMaterial, LicenseGrant, LicenseTerms,
    LicenseTier, OriginalityVerdict, PrincipalId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AssetFilter, AssetStore, GrantInsert, GrantStore};

/// SQLite-based store implementing both [`AssetStore`] and [`GrantStore`].
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }
}

// Helper to convert a row to an Asset.
fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let id: String = row.get("asset_id")?;
    let owner: String = row.get("owner")?;
    let category: String = row.get("category")?;
    let license_terms: String = row.get("license_terms")?;

    Ok(Asset {
        id: AssetId::parse(&id).map_err(|_| invalid_column("asset_id"))?,
        owner: PrincipalId::parse(&owner).map_err(|_| invalid_column("owner"))?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: ContentCategory::from_str(&category).map_err(|_| invalid_column("category"))?,
        original_file_name: row.get("original_file_name")?,
        storage_path: row.get("storage_path")?,
        cid: row.get("cid")?,
        originality: OriginalityVerdict {
            is_original: row.get::<_, i64>("is_original")? != 0,
            score: row.get::<_, i64>("originality_score")?.clamp(0, 100) as u8,
        },
        registration_id: row.get("registration_id")?,
        license_terms: serde_json::from_str::<LicenseTerms>(&license_terms)
            .map_err(|_| invalid_column("license_terms"))?,
        created_at: row.get("created_at")?,
    })
}

// Helper to convert a row to a LicenseGrant.
fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<LicenseGrant> {
    let id: String = row.get("grant_id")?;
    let principal: String = row.get("principal")?;
    let asset: String = row.get("asset_id")?;
    let tier: String = row.get("tier")?;

    Ok(LicenseGrant {
        id: GrantId(uuid::Uuid::parse_str(&id).map_err(|_| invalid_column("grant_id"))?),
        principal: PrincipalId::parse(&principal).map_err(|_| invalid_column("principal"))?,
        asset: AssetId::parse(&asset).map_err(|_| invalid_column("asset_id"))?,
        transaction_ref: row.get("transaction_ref")?,
        tier: parse_tier(&tier).map_err(|_| invalid_column("tier"))?,
        issued_at: row.get("issued_at")?,
        expires_at: row.get("expires_at")?,
        active: row.get::<_, i64>("active")? != 0,
    })
}

fn parse_tier(s: &str) -> std::result::Result<LicenseTier, ()> {
    match s {
        "license1" => Ok(LicenseTier::OneTime),
        "license2" => Ok(LicenseTier::Limited),
        "license3" => Ok(LicenseTier::Commercial),
        "license4" => Ok(LicenseTier::Exclusive),
        _ => Err(()),
    }
}

fn invalid_column(name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, name.into(), rusqlite::types::Type::Text)
}

const ASSET_COLUMNS: &str = "asset_id, owner, title, description, category, original_file_name, \
                             storage_path, cid, is_original, originality_score, registration_id, \
                             license_terms, created_at";

#[async_trait]
impl AssetStore for SqliteStore {
    async fn insert_asset(&self, asset: &Asset) -> Result<()> {
        let terms = serde_json::to_string(&asset.license_terms)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO assets (asset_id, owner, title, description, category, \
                 original_file_name, storage_path, cid, is_original, originality_score, \
                 registration_id, license_terms, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    asset.id.to_string(),
                    asset.owner.to_string(),
                    asset.title,
                    asset.description,
                    asset.category.as_str(),
                    asset.original_file_name,
                    asset.storage_path,
                    asset.cid,
                    asset.originality.is_original as i64,
                    asset.originality.score as i64,
                    asset.registration_id,
                    terms,
                    asset.created_at,
                ],
            )?;
            Ok(())
        })
    }

    async fn asset(&self, id: &AssetId) -> Result<Option<Asset>> {
        self.with_conn(|conn| {
            let asset = conn
                .query_row(
                    &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE asset_id = ?1"),
                    params![id.to_string()],
                    row_to_asset,
                )
                .optional()?;
            Ok(asset)
        })
    }

    async fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>> {
        self.with_conn(|conn| {
            let sql = if filter.verified_only {
                format!(
                    "SELECT {ASSET_COLUMNS} FROM assets WHERE is_original = 1 \
                     ORDER BY created_at DESC"
                )
            } else {
                format!("SELECT {ASSET_COLUMNS} FROM assets ORDER BY created_at DESC")
            };
            let mut stmt = conn.prepare(&sql)?;
            let assets = stmt
                .query_map([], row_to_asset)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(assets)
        })
    }

    async fn set_originality(&self, id: &AssetId, verdict: OriginalityVerdict) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE assets SET is_original = ?1, originality_score = ?2 WHERE asset_id = ?3",
                params![verdict.is_original as i64, verdict.score as i64, id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }

    async fn set_registration(&self, id: &AssetId, registration_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE assets SET registration_id = ?1 WHERE asset_id = ?2",
                params![registration_id, id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }

    async fn seal(&self, id: &AssetId, material: &KeyMaterial, cid: &str) -> Result<()> {
        self.with_conn(|conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM assets WHERE asset_id = ?1",
                    params![id.to_string()],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !exists {
                return Err(StoreError::NotFound(id.to_string()));
            }

            let sealed: bool = conn
                .query_row(
                    "SELECT 1 FROM asset_keys WHERE asset_id = ?1",
                    params![id.to_string()],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if sealed {
                return Err(StoreError::SealViolation(id.to_string()));
            }

            conn.execute(
                "INSERT INTO asset_keys (asset_id, enc_key, iv, sealed_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    material.key.to_hex(),
                    material.iv.to_hex(),
                    vaultstream_core::now_millis(),
                ],
            )?;
            conn.execute(
                "UPDATE assets SET cid = ?1 WHERE asset_id = ?2",
                params![cid, id.to_string()],
            )?;
            Ok(())
        })
    }

    async fn key_material(&self, id: &AssetId) -> Result<Option<KeyMaterial>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT enc_key, iv FROM asset_keys WHERE asset_id = ?1",
                    params![id.to_string()],
                    |row| {
                        Ok((row.get::<_, String>("enc_key")?, row.get::<_, String>("iv")?))
                    },
                )
                .optional()?;
            match row {
                Some((key, iv)) => {
                    let material = KeyMaterial::from_hex(&key, &iv)
                        .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                    Ok(Some(material))
                }
                None => Ok(None),
            }
        })
    }

    async fn delete_asset(&self, id: &AssetId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM asset_keys WHERE asset_id = ?1",
                params![id.to_string()],
            )?;
            conn.execute(
                "DELETE FROM grants WHERE asset_id = ?1",
                params![id.to_string()],
            )?;
            conn.execute(
                "DELETE FROM assets WHERE asset_id = ?1",
                params![id.to_string()],
            )?;
            Ok(())
        })
    }
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn insert_grant(&self, grant: &LicenseGrant) -> Result<GrantInsert> {
        self.with_conn(|conn| {
            let duplicate: bool = conn
                .query_row(
                    "SELECT 1 FROM grants WHERE transaction_ref = ?1",
                    params![grant.transaction_ref],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if duplicate {
                return Ok(GrantInsert::DuplicateTransaction);
            }

            conn.execute(
                "INSERT INTO grants (grant_id, principal, asset_id, transaction_ref, tier, \
                 issued_at, expires_at, active) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    grant.id.to_string(),
                    grant.principal.to_string(),
                    grant.asset.to_string(),
                    grant.transaction_ref,
                    grant.tier.as_str(),
                    grant.issued_at,
                    grant.expires_at,
                    grant.active as i64,
                ],
            )?;
            Ok(GrantInsert::Inserted)
        })
    }

    async fn active_grants(
        &self,
        principal: &PrincipalId,
        asset: &AssetId,
    ) -> Result<Vec<LicenseGrant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT grant_id, principal, asset_id, transaction_ref, tier, issued_at, \
                 expires_at, active FROM grants \
                 WHERE principal = ?1 AND asset_id = ?2 AND active = 1 \
                 ORDER BY issued_at DESC",
            )?;
            let grants = stmt
                .query_map(params![principal.to_string(), asset.to_string()], row_to_grant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(grants)
        })
    }

    async fn grants_for_principal(&self, principal: &PrincipalId) -> Result<Vec<LicenseGrant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT grant_id, principal, asset_id, transaction_ref, tier, issued_at, \
                 expires_at, active FROM grants WHERE principal = ?1 ORDER BY issued_at DESC",
            )?;
            let grants = stmt
                .query_map(params![principal.to_string()], row_to_grant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(grants)
        })
    }

    async fn deactivate_grant(&self, grant: &GrantId) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE grants SET active = 0 WHERE grant_id = ?1",
                params![grant.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(grant.to_string()));
            }
            Ok(())
        })
    }
}
