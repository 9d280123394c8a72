//! Diagnostic-imaging appointment booking service.
//!
//! Patients book a slot for an imaging test, pay through the payment gateway
//! and receive email confirmations. Staff list, cancel and delete
//! appointments.
//!
//! # Architecture
//!
//! ```text
//!  HTTP (axum)  ──▶  api::*  ──▶  AppointmentService
//!                                    │
//!                 ┌──────────────────┼─────────────────────┐
//!                 ▼                  ▼                     ▼
//!        AppointmentStore     PaymentGateway      AppointmentReducer
//!          (Postgres)        (HTTP / sandbox)            │
//!                                                 Effect::Future
//!                                                        │
//!                                                  EffectRunner ──▶ Notifier
//!                                                                (SMTP / console)
//! ```
//!
//! # Modules
//!
//! - [`workflow`]: booking, payment confirmation, cancel, delete, list, get
//! - [`api`] / [`server`]: HTTP handlers and router
//! - [`gateway`] / [`notifier`]: production collaborators
//! - [`config`] / [`bootstrap`]: environment configuration and wiring
//! - [`metrics`]: business counters

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod notifier;
pub mod server;
pub mod workflow;

pub use config::Config;
pub use workflow::{AppointmentService, BookingReceipt};
