//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID
//! - `ApiJson`: JSON body whose rejections render as [`AppError`]
//! - `ApiQuery`: query string whose rejections render as [`AppError`]
//!
//! Axum's own `Json` and `Query` reject with plain-text bodies. The wrappers
//! here keep every 4xx in the `{ "code", "message" }` shape.
//!
//! # Examples
//!
//! ```ignore
//! use imaging_booking_web::extractors::{ApiJson, CorrelationId};
//!
//! async fn handler(
//!     State(state): State<AppState>,
//!     correlation_id: CorrelationId,
//!     ApiJson(request): ApiJson<BookingRequest>,
//! ) -> Result<Json<BookingReceipt>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Booking");
//!     Ok(Json(state.appointments.book(&request).await?))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::inbound_correlation_id;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and finally generates a new UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        Ok(Self(inbound_correlation_id(&parts.headers).unwrap_or_else(Uuid::new_v4)))
    }
}

/// JSON request body. Malformed or mistyped bodies become 400 `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
                Err(AppError::validation(json_rejection_message(&rejection)))
            },
        }
    }
}

/// Client-facing text for a rejected body. Decoder details stay in the logs.
fn json_rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonSyntaxError(_) => "malformed JSON body",
        JsonRejection::MissingJsonContentType(_) => "expected a JSON body",
        _ => "invalid request body",
    }
}

/// Query-string parameters. Undecodable queries become 400 `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected query string");
                Err(AppError::validation("invalid query string"))
            },
        }
    }
}
