//! The two-tier authorization resolution algorithm.
//!
//! Local grants are consulted before the ledger: they avoid a network
//! round trip on every stream, and they are the only records able to
//! express time-bounded licenses (the ledger answers lifetime queries
//! only). An expired local grant is therefore authoritative - resolution
//! does not fall through to the ledger to resurrect it.

use std::sync::Arc;

use vaultstream_core::{now_millis, Asset, Principal};
use vaultstream_store::GrantStore;

use crate::ledger::LedgerOracle;

/// How an allowed request qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// The requesting principal owns the asset.
    Owner,
    /// A currently valid local grant.
    LocalGrant,
    /// A lifetime license confirmed by the ledger oracle.
    Ledger,
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal has no linked external identity.
    NoIdentity,
    /// The asset is not verified original; it is never delivered to
    /// non-owners.
    NotOriginal,
    /// Every matching local grant has expired.
    Expired,
    /// The asset has no on-chain registration, so the ledger cannot be
    /// consulted.
    NotMinted,
    /// The ledger holds no license for this principal.
    NoLicense,
    /// The ledger could not be queried; denied rather than assumed.
    VerificationFailed,
}

impl DenyReason {
    /// Human-readable reason, surfaced to the client.
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NoIdentity => "no linked wallet",
            DenyReason::NotOriginal => "asset is not verified original",
            DenyReason::Expired => "license expired",
            DenyReason::NotMinted => "asset not minted on ledger",
            DenyReason::NoLicense => "no valid license found",
            DenyReason::VerificationFailed => "license verification failed",
        }
    }
}

/// Outcome of an authorization resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(AccessPath),
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// Resolves `(principal, asset)` to an allow/deny decision.
///
/// Stateless and side-effect-free apart from its two data reads; safe to
/// call concurrently without coordination.
pub struct AccessResolver {
    grants: Arc<dyn GrantStore>,
    ledger: Arc<dyn LedgerOracle>,
}

impl AccessResolver {
    pub fn new(grants: Arc<dyn GrantStore>, ledger: Arc<dyn LedgerOracle>) -> Self {
        Self { grants, ledger }
    }

    /// Resolve at the current wall clock.
    pub async fn authorize(&self, principal: &Principal, asset: &Asset) -> Decision {
        self.authorize_at(principal, asset, now_millis()).await
    }

    /// Resolve at an explicit instant. Steps, short-circuiting on the
    /// first conclusive answer:
    ///
    /// 1. Owner bypass - no license required.
    /// 2. Unverified assets are never delivered to non-owners.
    /// 3. A principal without an external identity cannot hold a license.
    /// 4. Active local grants: one valid grant allows; if every matching
    ///    grant has expired, deny without consulting the ledger.
    /// 5. No local grant at all: fall back to the ledger oracle, which
    ///    requires the asset to be minted. Oracle errors deny.
    pub async fn authorize_at(&self, principal: &Principal, asset: &Asset, now: i64) -> Decision {
        if asset.owner == principal.id {
            return Decision::Allowed(AccessPath::Owner);
        }

        if !asset.originality.is_original {
            return Decision::Denied(DenyReason::NotOriginal);
        }

        let Some(wallet) = principal.wallet else {
            return Decision::Denied(DenyReason::NoIdentity);
        };

        let grants = match self.grants.active_grants(&principal.id, &asset.id).await {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(asset = %asset.id, error = %e, "grant lookup failed");
                return Decision::Denied(DenyReason::VerificationFailed);
            }
        };

        if !grants.is_empty() {
            if grants.iter().any(|g| g.is_valid(now)) {
                return Decision::Allowed(AccessPath::LocalGrant);
            }
            // Only expired grants: authoritative. The ledger cannot know
            // about expiry, so it gets no say here.
            return Decision::Denied(DenyReason::Expired);
        }

        let Some(registration_id) = asset.registration_id.as_deref() else {
            return Decision::Denied(DenyReason::NotMinted);
        };

        match self.ledger.has_license(&wallet, registration_id).await {
            Ok(true) => Decision::Allowed(AccessPath::Ledger),
            Ok(false) => Decision::Denied(DenyReason::NoLicense),
            Err(e) => {
                tracing::warn!(asset = %asset.id, error = %e, "ledger verification failed");
                Decision::Denied(DenyReason::VerificationFailed)
            }
        }
    }
}
