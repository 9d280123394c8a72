//! Axum integration for the imaging booking service.
//!
//! This crate is the HTTP edge of the "Functional Core, Imperative Shell"
//! split: it owns nothing but the translation between HTTP and the domain.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, correlation IDs
//! │  - Request parsing (ApiJson, ApiQuery)  │  ← Malformed input → 400
//! │  - Response serialization (AppError)    │  ← Logging of server faults
//! ├─────────────────────────────────────────┤
//! │         Booking workflows               │  ← imaging-booking
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │  ← imaging-booking-core
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imaging_booking_web::{propagate_correlation_id, ApiJson, AppError};
//! use axum::{middleware::from_fn, routing::post, Json, Router};
//!
//! async fn book(
//!     State(state): State<AppState>,
//!     ApiJson(request): ApiJson<BookingRequest>,
//! ) -> Result<Json<BookingReceipt>, AppError> {
//!     Ok(Json(state.appointments.book(&request).await?))
//! }
//!
//! let app = Router::new()
//!     .route("/api/appointments", post(book))
//!     .layer(from_fn(propagate_correlation_id))
//!     .with_state(app_state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiJson, ApiQuery, CorrelationId};
pub use middleware::{propagate_correlation_id, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
