//! # Vaultstream Server
//!
//! The delivery server: serves decrypted asset bytes under HTTP range
//! semantics to authorized principals, secures uploads (encrypt + pin),
//! and records license grants synced from ledger transactions.
//!
//! ## Request flow
//!
//! A stream request is authorized by the resolver, materialized through
//! the shared artifact cache, and then served either as a plain
//! range-capable file stream or piped through the watermark filter.
//!
//! ## Key Types
//!
//! - [`AppState`] - injected dependencies for all handlers
//! - [`ArtifactCache`] - shared decrypted-artifact cache
//! - [`Config`] - environment-driven configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod originality;
pub mod pin;
pub mod routes;
pub mod state;
pub mod watermark;

pub use cache::ArtifactCache;
pub use config::Config;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
