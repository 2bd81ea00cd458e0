//! Custom Axum extractors.
//!
//! - `CorrelationId`: read or generate the request correlation id
//! - `Actor`: the authenticated user on whose behalf the request runs

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use raffle_core::UserId;
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the front layer.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Correlation ID for request tracing.
///
/// Prefers the id stored by `correlation_id_layer`, then the
/// `X-Correlation-ID` header, then a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The user performing an administrative action.
///
/// Authentication happens upstream; this extractor only trusts the
/// `X-User-Id` header and rejects the request with 401 when it is missing or
/// not a UUID.
///
/// # Example
///
/// ```ignore
/// async fn cancel(Actor(actor): Actor, Path(id): Path<Uuid>) -> WebResult<Json<Raffle>> {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing X-User-Id header"))?;

        value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|id| Self(UserId::from_uuid(id)))
            .ok_or_else(|| AppError::unauthorized("Malformed X-User-Id header"))
    }
}
