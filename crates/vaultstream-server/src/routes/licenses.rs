//! License sync: recording grants from external ledger transactions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use vaultstream_core::{now_millis, AssetId, GrantId, LicenseGrant, LicenseTier};
use vaultstream_store::{AssetStore, GrantInsert, GrantStore};

use crate::error::ApiError;
use crate::state::{AppState, AuthenticatedPrincipal};

#[derive(Debug, Deserialize)]
pub struct SyncLicenseRequest {
    pub asset_id: String,
    pub transaction_ref: String,
    pub tier: LicenseTier,
}

/// POST /licenses/sync
///
/// Records a purchase already settled on the ledger as a local grant.
/// Expiry is derived from the tier; the transaction reference is the
/// idempotence key, so replaying a sync is rejected rather than
/// double-recorded.
pub async fn sync_license(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<SyncLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseGrant>), ApiError> {
    let asset_id: AssetId = request
        .asset_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid asset id".into()))?;
    if request.transaction_ref.trim().is_empty() {
        return Err(ApiError::BadRequest("missing transaction reference".into()));
    }

    state
        .assets
        .asset(&asset_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset {asset_id}")))?;

    let now = now_millis();
    let grant = LicenseGrant {
        id: GrantId::generate(),
        principal: principal.id,
        asset: asset_id,
        transaction_ref: request.transaction_ref,
        tier: request.tier,
        issued_at: now,
        expires_at: expiry_for(request.tier, now),
        active: true,
    };

    match state.grants.insert_grant(&grant).await? {
        GrantInsert::Inserted => {
            tracing::info!(
                asset = %asset_id,
                principal = %principal.id,
                tier = grant.tier.as_str(),
                "license grant recorded"
            );
            Ok((StatusCode::CREATED, Json(grant)))
        }
        GrantInsert::DuplicateTransaction => Err(ApiError::DuplicateTransaction),
    }
}

/// Expiry for a grant of `tier` issued at `issued_at`.
fn expiry_for(tier: LicenseTier, issued_at: i64) -> Option<i64> {
    tier.default_duration_ms().map(|d| issued_at + d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limited_tier_expires_in_a_day() {
        let issued = 1_000_000;
        assert_eq!(
            expiry_for(LicenseTier::Limited, issued),
            Some(issued + 24 * 60 * 60 * 1000)
        );
    }

    #[test]
    fn test_other_tiers_unbounded() {
        for tier in [
            LicenseTier::OneTime,
            LicenseTier::Commercial,
            LicenseTier::Exclusive,
        ] {
            assert_eq!(expiry_for(tier, 0), None);
        }
    }
}
