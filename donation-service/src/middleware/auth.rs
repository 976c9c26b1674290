//! NGO identity extractor.
//!
//! The upstream auth layer authenticates NGO users and forwards the
//! actor's id in the `X-Ngo-ID` header; this service trusts that header
//! on campaign-mutation endpoints. Donation creation and confirmation
//! endpoints are public and never use this extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use platform_core::error::AppError;
use uuid::Uuid;

/// Authenticated NGO actor, as asserted by the upstream auth layer.
#[derive(Debug, Clone, Copy)]
pub struct NgoIdentity {
    pub ngo_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for NgoIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-Ngo-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-Ngo-ID header (required from auth layer)"
                ))
            })?;

        let ngo_id = Uuid::parse_str(raw).map_err(|_| {
            AppError::Unauthorized(anyhow::anyhow!("Invalid X-Ngo-ID header value"))
        })?;

        Ok(NgoIdentity { ngo_id })
    }
}
