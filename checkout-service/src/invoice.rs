use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

/// Invoice creation and delivery, both best-effort: callers log failures and
/// never roll back already-committed payment state because of them.
#[async_trait::async_trait]
pub trait InvoiceService: Send + Sync {
    async fn make_invoice(&self, order_id: Uuid) -> Result<Uuid>;
    async fn send_invoice(&self, invoice_id: Uuid) -> Result<()>;
}

pub struct HttpInvoiceService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInvoiceService {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct InvoiceCreated {
    invoice_id: Uuid,
}

#[async_trait::async_trait]
impl InvoiceService for HttpInvoiceService {
    async fn make_invoice(&self, order_id: Uuid) -> Result<Uuid> {
        let resp = self
            .client
            .post(format!("{}/invoices", self.base_url))
            .json(&serde_json::json!({ "orderId": order_id }))
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("invoice service returned {}", resp.status());
        }
        Ok(resp.json::<InvoiceCreated>().await?.invoice_id)
    }

    async fn send_invoice(&self, invoice_id: Uuid) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/invoices/{}/send", self.base_url, invoice_id))
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("invoice service returned {}", resp.status());
        }
        Ok(())
    }
}

/// Used when no `INVOICE_SERVICE_URL` is configured.
pub struct NoopInvoiceService;

#[async_trait::async_trait]
impl InvoiceService for NoopInvoiceService {
    async fn make_invoice(&self, order_id: Uuid) -> Result<Uuid> {
        tracing::debug!(order_id = %order_id, "invoice creation skipped (no service configured)");
        Ok(Uuid::new_v4())
    }

    async fn send_invoice(&self, _invoice_id: Uuid) -> Result<()> {
        Ok(())
    }
}
