//! # Vaultstream Auth
//!
//! The authorization resolver for the delivery pipeline.
//!
//! ## Overview
//!
//! Every stream request is resolved to an allow/deny decision by
//! combining two sources:
//!
//! 1. **Local grants** - the fast path, and the only source able to
//!    express time-bounded licenses.
//! 2. **The ledger oracle** - the authoritative external record of
//!    lifetime license ownership, consulted only when no local grant
//!    exists.
//!
//! Asset owners bypass licensing entirely. Oracle failures deny (fail
//! closed); the resolver never fails open.
//!
//! ## Key Types
//!
//! - [`AccessResolver`] - the resolution algorithm
//! - [`Decision`] / [`DenyReason`] / [`AccessPath`] - the outcome model
//! - [`LedgerOracle`] - the single read-only ledger query
//! - [`JsonRpcLedger`] - production oracle speaking `eth_call`
//! - [`StaticLedger`] - in-memory oracle for tests

pub mod error;
pub mod ledger;
pub mod resolver;

pub use error::LedgerError;
pub use ledger::{JsonRpcLedger, LedgerOracle, StaticLedger};
pub use resolver::{AccessPath, AccessResolver, Decision, DenyReason};
