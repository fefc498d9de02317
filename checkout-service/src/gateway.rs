use anyhow::Result;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResult {
    pub status: GatewayStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerIdentity {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Contract of the external payment processor. The core calls it once,
/// synchronously, after the order row is committed, and branches on `status`.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(
        &self,
        order_id: Uuid,
        amount: &BigDecimal,
        currency: &str,
        method: PaymentMethod,
        customer: &CustomerIdentity,
    ) -> Result<GatewayResult>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn process_payment(
        &self,
        order_id: Uuid,
        amount: &BigDecimal,
        currency: &str,
        method: PaymentMethod,
        customer: &CustomerIdentity,
    ) -> Result<GatewayResult> {
        let resp = self
            .client
            .post(format!("{}/payments", self.base_url))
            .json(&serde_json::json!({
                "orderId": order_id,
                "amount": amount,
                "currency": currency,
                "method": method,
                "customer": customer,
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("payment gateway returned {}", resp.status());
        }
        Ok(resp.json::<GatewayResult>().await?)
    }
}

/// Deterministic in-process gateway used when no `PAYMENT_GATEWAY_URL` is
/// configured; approves everything.
pub struct StubGateway;

impl StubGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StubGateway {
    async fn process_payment(
        &self,
        order_id: Uuid,
        amount: &BigDecimal,
        _currency: &str,
        _method: PaymentMethod,
        _customer: &CustomerIdentity,
    ) -> Result<GatewayResult> {
        let order = order_id.to_string();
        let reference = format!("STUB-APPROVED-{}", &order[..8.min(order.len())]);
        tracing::info!(order_id = %order_id, amount = %amount, reference = %reference, "stub gateway approved payment");
        Ok(GatewayResult {
            status: GatewayStatus::Success,
            message: None,
            gateway_reference: Some(reference),
        })
    }
}
