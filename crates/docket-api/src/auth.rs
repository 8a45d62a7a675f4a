//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated user id in
//! the `X-User-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use docket_core::models::UserId;
use docket_core::AppError;

use crate::constants::USER_ID_HEADER;
use crate::error::HttpAppError;

/// Authenticated caller, extracted from `X-User-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()))?;

        let user_id = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Unauthorized("Invalid user identity".to_string()))?;

        Ok(CurrentUser { user_id })
    }
}
