use std::collections::BTreeMap;

use anyhow::Result;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw user-supplied address fields, exactly as received from the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAddress {
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub region_id: Option<Uuid>,
    #[serde(default)]
    pub prefecture_id: Option<Uuid>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub region_id: Option<Uuid>,
    pub prefecture_id: Option<Uuid>,
    /// Shipping fee of the destination prefecture, when known.
    pub shipping_fee: Option<BigDecimal>,
    pub formatted: String,
}

#[derive(Debug)]
pub enum AddressOutcome {
    Resolved(ResolvedAddress),
    /// Field name -> problem. A non-empty map is a hard failure and must be
    /// surfaced before any stock is reserved.
    Invalid(BTreeMap<String, String>),
}

#[async_trait::async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, raw: &RawAddress) -> Result<AddressOutcome>;
}

pub struct HttpAddressResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAddressResolver {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    address: Option<ResolvedAddress>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self, raw: &RawAddress) -> Result<AddressOutcome> {
        let resp = self
            .client
            .post(format!("{}/addresses/resolve", self.base_url))
            .json(raw)
            .send()
            .await?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            anyhow::bail!("address service returned {}", resp.status());
        }
        let body = resp.json::<ResolveResponse>().await?;
        if !body.errors.is_empty() {
            return Ok(AddressOutcome::Invalid(body.errors));
        }
        match body.address {
            Some(address) => Ok(AddressOutcome::Resolved(address)),
            None => anyhow::bail!("address service returned neither address nor errors"),
        }
    }
}

/// Fallback resolver used when no `ADDRESS_SERVICE_URL` is configured: checks
/// the fields the order flow cannot live without and passes the rest through
/// with no fee lookup.
pub struct PassthroughAddressResolver;

#[async_trait::async_trait]
impl AddressResolver for PassthroughAddressResolver {
    async fn resolve(&self, raw: &RawAddress) -> Result<AddressOutcome> {
        let mut errors = BTreeMap::new();
        if raw.line1.as_deref().map(str::trim).unwrap_or("").is_empty() {
            errors.insert("line1".to_string(), "required".to_string());
        }
        if raw.postal_code.as_deref().map(str::trim).unwrap_or("").is_empty() {
            errors.insert("postal_code".to_string(), "required".to_string());
        }
        if !errors.is_empty() {
            return Ok(AddressOutcome::Invalid(errors));
        }
        let formatted = [
            raw.recipient.as_deref(),
            raw.postal_code.as_deref(),
            raw.line1.as_deref(),
            raw.line2.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
        Ok(AddressOutcome::Resolved(ResolvedAddress {
            region_id: raw.region_id,
            prefecture_id: raw.prefecture_id,
            shipping_fee: None,
            formatted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_rejects_missing_fields() {
        let resolver = PassthroughAddressResolver;
        let outcome = resolver.resolve(&RawAddress::default()).await.unwrap();
        match outcome {
            AddressOutcome::Invalid(errors) => {
                assert!(errors.contains_key("line1"));
                assert!(errors.contains_key("postal_code"));
            }
            AddressOutcome::Resolved(_) => panic!("empty address must not resolve"),
        }
    }

    #[tokio::test]
    async fn passthrough_formats_known_fields() {
        let resolver = PassthroughAddressResolver;
        let raw = RawAddress {
            postal_code: Some("100-0001".into()),
            line1: Some("1-1 Chiyoda".into()),
            recipient: Some("Taro".into()),
            ..Default::default()
        };
        match resolver.resolve(&raw).await.unwrap() {
            AddressOutcome::Resolved(address) => {
                assert_eq!(address.formatted, "Taro, 100-0001, 1-1 Chiyoda");
                assert!(address.shipping_fee.is_none());
            }
            AddressOutcome::Invalid(errors) => panic!("unexpected validation errors: {errors:?}"),
        }
    }
}
