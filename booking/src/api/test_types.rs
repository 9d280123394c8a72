//! Test catalogue endpoint.
//!
//! - GET /api/test-types - Every bookable test type with its price

use axum::Json;
use imaging_booking_core::TestType;
use serde::Serialize;

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestTypeResponse {
    /// Wire key used when booking
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// Price in whole currency units
    pub price: u32,
}

impl From<TestType> for TestTypeResponse {
    fn from(test_type: TestType) -> Self {
        Self {
            key: test_type.key(),
            name: test_type.display_name(),
            price: test_type.price(),
        }
    }
}

/// List the test catalogue in catalogue order.
#[allow(clippy::unused_async)]
pub async fn list_test_types() -> Json<Vec<TestTypeResponse>> {
    Json(TestType::ALL.into_iter().map(TestTypeResponse::from).collect())
}
