use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use trailhead_core::{GatewayError, GatewayOrder, PaymentGateway};

/// Orders API client for Razorpay-compatible gateways
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    amount: i64,
    currency: String,
}

impl RazorpayGateway {
    pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody { amount: amount_minor, currency, receipt })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let body: OrderBody = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(GatewayOrder {
            id: body.id,
            amount: body.amount,
            currency: body.currency,
        })
    }
}

/// In-process gateway for local runs and tests.
///
/// Order ids are derived from the receipt so they are predictable.
#[derive(Default)]
pub struct MockGateway {
    failing: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_order` calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("simulated payment gateway outage".to_string()));
        }

        Ok(GatewayOrder {
            id: format!("order_mock_{}", receipt),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_orders() {
        let gateway = MockGateway::new();
        let order = gateway.create_order(5000, "INR", "rcpt_1").await.unwrap();
        assert_eq!(order.id, "order_mock_rcpt_1");
        assert_eq!(order.amount, 5000);
        assert_eq!(order.currency, "INR");

        gateway.set_failing(true);
        assert!(matches!(
            gateway.create_order(5000, "INR", "rcpt_2").await,
            Err(GatewayError::Transport(_))
        ));
    }

    #[test]
    fn test_create_order_body_shape() {
        let body = CreateOrderBody { amount: 5000, currency: "INR", receipt: "rcpt_1" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"amount": 5000, "currency": "INR", "receipt": "rcpt_1"}));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let gateway = RazorpayGateway::new("https://api.example.test/v1/", "key", "secret").unwrap();
        assert_eq!(gateway.base_url, "https://api.example.test/v1");
    }
}
