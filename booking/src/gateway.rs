//! Payment gateway clients.
//!
//! - [`HttpPaymentGateway`]: the provider's REST orders API over `reqwest`,
//!   authenticated with the key id and secret
//! - [`SandboxPaymentGateway`]: local development without credentials; orders
//!   are minted in-process and callbacks are signed with a fixed secret

use crate::config::GatewayConfig;
use imaging_booking_core::providers::{
    BoxFuture, CreateOrderRequest, GatewayError, PaymentGateway, PaymentOrder,
};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on error-body text kept in [`GatewayError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Signing secret used by the sandbox gateway.
pub const SANDBOX_SECRET: &str = "sandbox_secret";

/// Build the gateway selected by `config`.
///
/// # Errors
///
/// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
pub fn from_config(config: &GatewayConfig) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    if config.is_sandbox() {
        tracing::warn!("No gateway credentials configured, using the sandbox payment gateway");
        return Ok(Arc::new(SandboxPaymentGateway::new()));
    }
    Ok(Arc::new(HttpPaymentGateway::new(config)?))
}

// ============================================================================
// HTTP gateway
// ============================================================================

#[derive(Serialize)]
struct OrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

/// REST orders API client.
#[derive(Clone, Debug)]
pub struct HttpPaymentGateway {
    http_client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    /// Create a client with the configured credentials and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/v1/orders", self.base_url)
    }
}

fn transport_error(error: &reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(error.to_string())
    }
}

impl PaymentGateway for HttpPaymentGateway {
    fn create_order(&self, request: CreateOrderRequest) -> BoxFuture<'_, Result<PaymentOrder, GatewayError>> {
        Box::pin(async move {
            let body = OrderBody {
                amount: request.amount_minor,
                currency: &request.currency,
                receipt: &request.receipt,
            };

            let response = self
                .http_client
                .post(self.orders_url())
                .basic_auth(&self.key_id, Some(&self.key_secret))
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                let mut message = response.text().await.unwrap_or_default();
                if message.len() > MAX_ERROR_BODY {
                    let mut cut = MAX_ERROR_BODY;
                    while !message.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    message.truncate(cut);
                }
                return Err(GatewayError::Http {
                    status: status.as_u16(),
                    message,
                });
            }

            let order: PaymentOrder = response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

            tracing::debug!(order_id = %order.id, amount = order.amount, "Gateway order created");
            Ok(order)
        })
    }

    fn signing_secret(&self) -> &str {
        &self.key_secret
    }
}

// ============================================================================
// Sandbox gateway
// ============================================================================

/// In-process gateway for local development.
#[derive(Clone, Debug, Default)]
pub struct SandboxPaymentGateway;

impl SandboxPaymentGateway {
    /// Create a sandbox gateway.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PaymentGateway for SandboxPaymentGateway {
    fn create_order(&self, request: CreateOrderRequest) -> BoxFuture<'_, Result<PaymentOrder, GatewayError>> {
        Box::pin(async move {
            let order = PaymentOrder {
                id: format!("order_sandbox_{}", Uuid::new_v4().simple()),
                amount: request.amount_minor,
                currency: request.currency,
            };
            tracing::info!(order_id = %order.id, receipt = %request.receipt, "Sandbox order created");
            Ok(order)
        })
    }

    fn signing_secret(&self) -> &str {
        SANDBOX_SECRET
    }
}
