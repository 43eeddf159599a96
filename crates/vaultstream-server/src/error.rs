//! API error type and HTTP status mapping.
//!
//! Authorization denials surface as 401/403 with a reason string;
//! infrastructure failures (decrypt, missing blob, oracle trouble)
//! surface as 500 and never leave partially written artifacts behind.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use vaultstream_auth::DenyReason;
use vaultstream_store::StoreError;

/// Errors surfaced by the delivery API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No authenticated principal on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Authorization resolved to a deny.
    #[error("{}", .0.message())]
    Denied(DenyReason),

    #[error("not found: {0}")]
    NotFound(String),

    /// The principal is not the asset owner.
    #[error("not authorized for this asset")]
    Forbidden,

    /// Securing requires a true originality verdict.
    #[error("cannot secure an asset that is not verified original")]
    NotVerified,

    /// A grant already exists for this transaction reference.
    #[error("license already recorded for this transaction")]
    DuplicateTransaction,

    /// Range start lies beyond the end of the file.
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("encrypted source blob missing: {0}")]
    SourceBlobMissing(String),

    /// The watermark filter is absent or failed to start. The request is
    /// rejected; protection is never silently downgraded.
    #[error("watermarking service unavailable: {0}")]
    TransformUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Denied(reason) => match reason {
                DenyReason::NoIdentity => StatusCode::UNAUTHORIZED,
                DenyReason::NotOriginal
                | DenyReason::Expired
                | DenyReason::NotMinted
                | DenyReason::NoLicense => StatusCode::FORBIDDEN,
                DenyReason::VerificationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotVerified | ApiError::DuplicateTransaction => StatusCode::CONFLICT,
            ApiError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::EncryptionFailed(_)
            | ApiError::DecryptionFailed(_)
            | ApiError::SourceBlobMissing(_)
            | ApiError::TransformUnavailable(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "success": false, "error": self.to_string() }));

        if let ApiError::RangeNotSatisfiable { size } = self {
            return (
                status,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
                body,
            )
                .into_response();
        }

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::SealViolation(_) => ApiError::Internal(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reason_statuses() {
        assert_eq!(
            ApiError::Denied(DenyReason::NoIdentity).status(),
            StatusCode::UNAUTHORIZED
        );
        for reason in [
            DenyReason::NotOriginal,
            DenyReason::Expired,
            DenyReason::NotMinted,
            DenyReason::NoLicense,
        ] {
            assert_eq!(ApiError::Denied(reason).status(), StatusCode::FORBIDDEN);
        }
        assert_eq!(
            ApiError::Denied(DenyReason::VerificationFailed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_statuses() {
        assert_eq!(ApiError::NotVerified.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::DuplicateTransaction.status(), StatusCode::CONFLICT);
    }
}
