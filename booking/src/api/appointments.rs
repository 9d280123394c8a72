//! Appointment API endpoints.
//!
//! - GET /api/appointments - List with filters and pagination
//! - POST /api/appointments - Book (creates the gateway order)
//! - POST /api/appointments/verify-payment - Confirm a signed payment callback
//! - GET /api/appointments/:id - Get one appointment
//! - PATCH /api/appointments/:id/cancel - Cancel
//! - DELETE /api/appointments/:id - Delete permanently

use crate::server::state::AppState;
use crate::workflow::BookingReceipt;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use imaging_booking_core::appointment::Appointment;
use imaging_booking_core::validation::{BookingRequest, ListQuery, PaymentVerificationRequest};
use imaging_booking_web::{ApiJson, ApiQuery, AppError, CorrelationId};
use serde::Serialize;

// ============================================================================
// Response Types
// ============================================================================

/// Pagination block of the list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page
    pub current_page: u32,
    /// `ceil(total_appointments / limit)`
    pub total_pages: u64,
    /// Matching records across all pages
    pub total_appointments: u64,
    /// Page size
    pub limit: u32,
}

/// Response for listing appointments.
#[derive(Debug, Clone, Serialize)]
pub struct ListAppointmentsResponse {
    /// Appointments on this page
    pub appointments: Vec<Appointment>,
    /// Page metadata
    pub pagination: Pagination,
}

/// Response after deleting an appointment.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteAppointmentResponse {
    /// Confirmation message
    pub message: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

/// List appointments.
///
/// # Errors
///
/// Returns 400 for invalid filters, 500 if the store fails.
pub async fn list_appointments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListAppointmentsResponse>, AppError> {
    let page = state.appointments.list(&query).await?;
    Ok(Json(ListAppointmentsResponse {
        pagination: Pagination {
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_appointments: page.total_items,
            limit: page.limit,
        },
        appointments: page.items,
    }))
}

/// Book an appointment.
///
/// # Errors
///
/// Returns 400 for invalid input, 409 if the slot is taken, 502 if the
/// payment gateway fails.
pub async fn create_appointment(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    tracing::debug!(correlation_id = %correlation_id.0, "Booking request received");
    let receipt = state.appointments.book(&request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Confirm a payment from the gateway callback.
///
/// # Errors
///
/// Returns 400 for missing fields or a bad signature, 404 for an unknown
/// order, 409 if the appointment cannot be confirmed.
pub async fn verify_payment(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PaymentVerificationRequest>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.appointments.verify_payment(&request).await?))
}

/// Get one appointment.
///
/// # Errors
///
/// Returns 404 for an unknown or malformed id.
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.appointments.get(&id).await?))
}

/// Cancel an appointment.
///
/// # Errors
///
/// Returns 404 for an unknown id, 409 if already cancelled.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.appointments.cancel(&id).await?))
}

/// Delete an appointment.
///
/// # Errors
///
/// Returns 404 for an unknown id.
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAppointmentResponse>, AppError> {
    state.appointments.delete(&id).await?;
    Ok(Json(DeleteAppointmentResponse {
        message: "Appointment deleted successfully",
    }))
}
