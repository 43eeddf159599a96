//! Shared application state and the authenticated-principal extractor.
//!
//! Session issuance and wallet-signature verification happen upstream
//! (at the API gateway); this server trusts the identity headers the
//! gateway forwards.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use vaultstream_auth::AccessResolver;
use vaultstream_core::{Principal, PrincipalId, WalletAddress};
use vaultstream_store::{AssetStore, GrantStore};

use crate::cache::ArtifactCache;
use crate::error::ApiError;
use crate::originality::OriginalityClient;
use crate::pin::BlobPinner;
use crate::watermark::FfmpegWatermarker;

/// Header carrying the authenticated principal's id.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Header carrying the principal's linked wallet, if any.
pub const WALLET_HEADER: &str = "x-wallet-address";

/// Injected dependencies for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<dyn AssetStore>,
    pub grants: Arc<dyn GrantStore>,
    pub resolver: Arc<AccessResolver>,
    pub cache: Arc<ArtifactCache>,
    pub originality: Arc<OriginalityClient>,
    pub pinner: Arc<dyn BlobPinner>,
    pub watermarker: Arc<FfmpegWatermarker>,
}

/// Extractor for the authenticated principal.
///
/// Requests without a principal header are rejected with 401. A present
/// but malformed wallet header is also rejected rather than silently
/// treated as "no wallet" - that would change the authorization path.
pub struct AuthenticatedPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let id: PrincipalId = id.parse().map_err(|_| ApiError::Unauthenticated)?;

        let wallet = match parts.headers.get(WALLET_HEADER) {
            Some(value) => {
                let raw = value.to_str().map_err(|_| {
                    ApiError::BadRequest("unreadable wallet address header".into())
                })?;
                Some(WalletAddress::from_hex(raw).map_err(|e| {
                    ApiError::BadRequest(format!("invalid wallet address: {e}"))
                })?)
            }
            None => None,
        };

        Ok(Self(Principal { id, wallet }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Principal, ApiError> {
        let (mut parts, ()) = request.into_parts();
        AuthenticatedPrincipal::from_request_parts(&mut parts, &())
            .await
            .map(|p| p.0)
    }

    #[tokio::test]
    async fn test_missing_principal_rejected() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            ApiError::Unauthenticated
        ));
    }

    #[tokio::test]
    async fn test_principal_with_wallet() {
        let id = PrincipalId::generate();
        let wallet = WalletAddress::from_bytes([0x77; 20]);
        let request = Request::builder()
            .header(PRINCIPAL_HEADER, id.to_string())
            .header(WALLET_HEADER, wallet.to_hex())
            .body(())
            .unwrap();

        let principal = extract(request).await.unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.wallet, Some(wallet));
    }

    #[tokio::test]
    async fn test_malformed_wallet_rejected() {
        let request = Request::builder()
            .header(PRINCIPAL_HEADER, PrincipalId::generate().to_string())
            .header(WALLET_HEADER, "0xnothex")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }
}
