//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            tracing::info!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, vaultstream_core::now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Asset records. Key material deliberately lives in its own table.
        CREATE TABLE assets (
            asset_id TEXT PRIMARY KEY,          -- UUID, hyphenated
            owner TEXT NOT NULL,                -- UUID of the owning principal
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,             -- video|audio|image|text
            original_file_name TEXT NOT NULL,
            storage_path TEXT NOT NULL,
            cid TEXT,                           -- content address of the pinned encrypted blob
            is_original INTEGER NOT NULL DEFAULT 0,
            originality_score INTEGER NOT NULL DEFAULT 0,
            registration_id TEXT,               -- on-chain id, set at mint time
            license_terms TEXT NOT NULL,        -- JSON
            created_at INTEGER NOT NULL         -- Unix ms
        );

        -- Sealed key material. One row per secured asset, written once.
        CREATE TABLE asset_keys (
            asset_id TEXT PRIMARY KEY REFERENCES assets(asset_id),
            enc_key TEXT NOT NULL,              -- 32 bytes, hex
            iv TEXT NOT NULL,                   -- 16 bytes, hex
            sealed_at INTEGER NOT NULL
        );

        -- License grants. transaction_ref is the idempotence key.
        CREATE TABLE grants (
            grant_id TEXT PRIMARY KEY,
            principal TEXT NOT NULL,
            asset_id TEXT NOT NULL,
            transaction_ref TEXT NOT NULL UNIQUE,
            tier TEXT NOT NULL,                 -- license1..license4
            issued_at INTEGER NOT NULL,
            expires_at INTEGER,                 -- NULL = unbounded
            active INTEGER NOT NULL DEFAULT 1
        );

        -- Indexes for common queries
        CREATE INDEX idx_assets_owner ON assets(owner);
        CREATE INDEX idx_assets_verified ON assets(is_original);
        CREATE INDEX idx_grants_principal_asset ON grants(principal, asset_id);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"assets".to_string()));
        assert!(tables.contains(&"asset_keys".to_string()));
        assert!(tables.contains(&"grants".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }
}
