use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;

/// Rates and fixed amounts the pricing engine needs per request.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// VAT-style rate applied to web orders.
    pub tax_rate_web: BigDecimal,
    /// Commerce tax rate applied to point-of-sale orders.
    pub tax_rate_pos: BigDecimal,
    /// Fixed surcharge added when the payment method is cash on delivery.
    pub cod_surcharge: BigDecimal,
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_web: decimal_default("0.08"),
            tax_rate_pos: decimal_default("0.10"),
            cod_surcharge: decimal_default("5.00"),
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pricing: PricingConfig,
    pub payment_gateway_url: Option<String>,
    pub address_service_url: Option<String>,
    pub invoice_service_url: Option<String>,
}

impl CheckoutConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8085);
        let tax_rate_web = decimal_env("CHECKOUT_TAX_RATE_WEB", "0.08");
        let tax_rate_pos = decimal_env("CHECKOUT_TAX_RATE_POS", "0.10");
        let cod_surcharge = decimal_env("CHECKOUT_COD_SURCHARGE", "5.00");
        let currency = env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "USD".to_string());
        let payment_gateway_url = env::var("PAYMENT_GATEWAY_URL").ok();
        let address_service_url = env::var("ADDRESS_SERVICE_URL").ok();
        let invoice_service_url = env::var("INVOICE_SERVICE_URL").ok();

        Ok(Self {
            database_url,
            host,
            port,
            pricing: PricingConfig { tax_rate_web, tax_rate_pos, cod_surcharge, currency },
            payment_gateway_url,
            address_service_url,
            invoice_service_url,
        })
    }
}

fn decimal_env(name: &str, default: &str) -> BigDecimal {
    env::var(name)
        .ok()
        .and_then(|value| BigDecimal::from_str(value.trim()).ok())
        .unwrap_or_else(|| decimal_default(default))
}

fn decimal_default(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).expect("default decimal literal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_channel_specific() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.tax_rate_web, decimal_default("0.08"));
        assert_eq!(pricing.tax_rate_pos, decimal_default("0.10"));
    }
}
