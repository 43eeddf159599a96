//! # Vaultstream Testkit
//!
//! Testing utilities shared by crate tests and integration tests.
//!
//! ## Overview
//!
//! - **Fixtures**: a [`TestFixture`] bundling in-memory stores, a static
//!   ledger, and a temp directory, with helpers to mint assets, secure
//!   them on disk, and issue grants.
//! - **Generators**: proptest strategies for categories, tiers, and raw
//!   engine reports.
//!
//! ## Usage
//!
//! ```rust
//! use vaultstream_testkit::TestFixture;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let fixture = TestFixture::new();
//! let owner = fixture.principal_with_wallet();
//! let asset = fixture.secured_asset(owner.id, b"media bytes").await;
//! assert!(asset.is_secured());
//! # }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::TestFixture;
pub use generators::{content_category, engine_report, license_tier};
