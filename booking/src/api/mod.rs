//! HTTP API handlers.

pub mod appointments;
pub mod test_types;
