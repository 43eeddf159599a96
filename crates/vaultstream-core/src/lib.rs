//! # Vaultstream Core
//!
//! Pure primitives for the Vaultstream delivery pipeline: the asset and
//! grant data model, the stream cipher service, content-type resolution,
//! and originality-score normalization.
//!
//! This crate contains no networking and no database access. File I/O is
//! limited to the cipher service, which operates on caller-supplied
//! readers and writers.
//!
//! ## Key Types
//!
//! - [`Asset`] - A registered piece of content and its delivery metadata
//! - [`LicenseGrant`] - A local record authorizing a principal, optionally time-bounded
//! - [`KeyMaterial`] - Per-asset AES-256-CBC key and IV, sealed at securing time
//! - [`ContentCategory`] - Content kind, carrying MIME and scoring rules
//! - [`OriginalityVerdict`] - Normalized result of an originality check

pub mod cipher;
pub mod error;
pub mod media;
pub mod originality;
pub mod types;

pub use cipher::{decrypt_file, decrypt_stream, encrypt_file, encrypt_stream, CipherIv, CipherKey, KeyMaterial};
pub use error::CoreError;
pub use originality::{EngineReport, OriginalityVerdict};
pub use types::{
    now_millis, Asset, AssetId, ContentCategory, GrantId, LicenseGrant, LicenseTerms, LicenseTier,
    Principal, PrincipalId, RoyaltySplit, TierTerms, WalletAddress,
};
