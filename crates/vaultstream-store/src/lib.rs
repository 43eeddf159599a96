//! # Vaultstream Store
//!
//! Storage abstraction for Vaultstream. Provides trait-based interfaces
//! for asset and license-grant persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`AssetStore`] / [`GrantStore`] - The async storage traits
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`GrantInsert`] - Result of recording a license grant
//!
//! ## Design Notes
//!
//! - **Key material is opt-in**: default asset reads never include the
//!   encryption key or IV; [`AssetStore::key_material`] is the only way
//!   to fetch them.
//! - **Seal-once**: [`AssetStore::seal`] sets key material and content
//!   address exactly once; a second attempt is a [`StoreError::SealViolation`].
//! - **Idempotent grant sync**: inserting a grant whose transaction
//!   reference already exists returns [`GrantInsert::DuplicateTransaction`].

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AssetFilter, AssetStore, GrantInsert, GrantStore};
