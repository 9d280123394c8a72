//! Correlation-ID propagation.
//!
//! [`propagate_correlation_id`] is installed with `axum::middleware::from_fn`.
//! Each request gets a [`CorrelationId`] extension taken from
//! `X-Correlation-ID` when it holds a UUID, or a fresh v4 otherwise. The
//! handler runs inside an `http_request` span carrying the ID and the response
//! echoes it back.
//!
//! ```ignore
//! use axum::{middleware::from_fn, routing::get, Router};
//! use imaging_booking_web::middleware::propagate_correlation_id;
//!
//! let app = Router::new()
//!     .route("/api/appointments", get(list_appointments))
//!     .layer(from_fn(propagate_correlation_id));
//! ```

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Request and response header carrying the correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// The caller's correlation ID, if it sent a valid one.
pub(crate) fn inbound_correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)?
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

/// Tag the request with a correlation ID and echo it on the response.
pub async fn propagate_correlation_id(mut req: Request, next: Next) -> Response {
    let id = inbound_correlation_id(req.headers()).unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(CorrelationId(id));

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    async fn echo_id(CorrelationId(id): CorrelationId) -> String {
        id.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/appointments", get(echo_id))
            .layer(from_fn(propagate_correlation_id))
    }

    async fn call(header: Option<&str>) -> (String, String) {
        let mut request = axum::http::Request::builder().uri("/appointments");
        if let Some(header) = header {
            request = request.header(CORRELATION_ID_HEADER, header);
        }
        let response = app().oneshot(request.body(Body::empty()).unwrap()).await.unwrap();

        let echoed = response.headers()[CORRELATION_ID_HEADER].to_str().unwrap().to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_inbound_id_reaches_handler_and_response() {
        let sent = "0b7e3c43-9a51-4c3e-8f0e-6b8f1d2f4a10";

        let (echoed, seen) = call(Some(sent)).await;

        assert_eq!(echoed, sent);
        assert_eq!(seen, sent);
    }

    #[tokio::test]
    async fn test_missing_or_garbage_id_is_replaced() {
        for header in [None, Some("booking-42")] {
            let (echoed, seen) = call(header).await;

            assert!(Uuid::parse_str(&echoed).is_ok());
            assert_eq!(echoed, seen);
        }
    }

    #[test]
    fn test_inbound_id_tolerates_whitespace() {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_static(" 0b7e3c43-9a51-4c3e-8f0e-6b8f1d2f4a10 "));

        assert!(inbound_correlation_id(&headers).is_some());
    }
}
