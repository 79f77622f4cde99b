//! Authenticated customer identity.
//!
//! Identity resolution lives in front of this service; the authentication
//! layer forwards the resolved customer as an opaque id in the
//! `x-customer-id` header. Handlers receive it as an explicit extractor
//! argument — there is no ambient "current user".

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::CustomerId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header the upstream authentication layer writes the customer id into.
pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// The authenticated customer for the current request.
#[derive(Debug, Clone, Copy)]
pub struct CustomerIdentity(pub CustomerId);

impl<S> FromRequestParts<S> for CustomerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CUSTOMER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {CUSTOMER_HEADER} header")))?;

        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("unreadable {CUSTOMER_HEADER} header")))?;

        let uuid = Uuid::parse_str(raw)
            .map_err(|e| ApiError::BadRequest(format!("invalid customer id: {e}")))?;

        Ok(Self(CustomerId::from_uuid(uuid)))
    }
}
