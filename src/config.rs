//! Runtime configuration for the bridge.
//!
//! Everything that used to be a module-level constant (sender address, provider
//! endpoint, exchange rate) lives on [`BridgeConfig`], resolved once at start-up
//! and handed to each component.

use crate::domain::shipment::SenderAddress;
use crate::error::{BridgeError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openlogi.com/api";
pub const DEFAULT_API_VERSION: &str = "1.5";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
/// USD to JPY.
pub const DEFAULT_CURRENCY_RATE: Decimal = dec!(150);
pub const REFERENCE_CURRENCY: &str = "USD";
pub const DESTINATION_CURRENCY: &str = "JPY";

/// Provider endpoint settings.
#[derive(Debug, Clone)]
pub struct FulfillmentApiConfig {
    pub base_url: String,
    pub token: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl Default for FulfillmentApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

/// Packaging applied to every shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingConfig {
    pub cushioning_unit: String,
    pub cushioning_type: String,
    pub gift_wrapping_unit: String,
    pub gift_wrapping_type: String,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            cushioning_unit: "ORDER".to_string(),
            cushioning_type: "BUBBLE_PACK".to_string(),
            gift_wrapping_unit: "ORDER".to_string(),
            gift_wrapping_type: "NAVY".to_string(),
        }
    }
}

/// Conversion settings consumed by the payload converter.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub currency_rate: Decimal,
    /// Flat handling charge in destination-currency units.
    pub handling_fee: Decimal,
    pub sender: SenderAddress,
    pub packaging: PackagingConfig,
    /// Internal product id to provider product code.
    pub product_codes: HashMap<String, String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            currency_rate: DEFAULT_CURRENCY_RATE,
            handling_fee: Decimal::ZERO,
            sender: default_sender(),
            packaging: PackagingConfig::default(),
            product_codes: HashMap::new(),
        }
    }
}

/// The fixed warehouse return address printed on every shipment.
pub fn default_sender() -> SenderAddress {
    SenderAddress {
        postcode: "1500001".to_string(),
        prefecture: "Tokyo".to_string(),
        address1: "Shibuya-ku Jingumae 1-2-3".to_string(),
        address2: Some("Harajuku Bldg 4F".to_string()),
        name: "Fulfillment Desk".to_string(),
        company: Some("Kura Goods K.K.".to_string()),
        phone: "0312345678".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub api: FulfillmentApiConfig,
    pub conversion: ConversionConfig,
    pub webhook_secret: String,
    /// Submit a shipment as soon as a payment is confirmed.
    pub auto_ship: bool,
    /// Include full error renderings in HTTP responses.
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api: FulfillmentApiConfig::default(),
            conversion: ConversionConfig::default(),
            webhook_secret: String::new(),
            auto_ship: true,
            debug: false,
        }
    }
}

impl BridgeConfig {
    /// Builds the configuration from defaults overridden by environment variables.
    ///
    /// - `FULFILLMENT_API_BASE_URL`, `FULFILLMENT_API_TOKEN`, `FULFILLMENT_API_VERSION`
    /// - `FULFILLMENT_API_TIMEOUT_SECS` (default: 30)
    /// - `WEBHOOK_SECRET` (required)
    /// - `CURRENCY_RATE` (default: 150), `HANDLING_FEE` (default: 0)
    /// - `AUTO_SHIP` (default: true), `BRIDGE_DEBUG` (default: false)
    /// - `PRODUCT_CODE_MAP` as `id=code,id=code`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BridgeConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("FULFILLMENT_API_BASE_URL") {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("FULFILLMENT_API_TOKEN") {
            config.api.token = token;
        }
        if let Some(version) = lookup("FULFILLMENT_API_VERSION") {
            config.api.api_version = version;
        }
        if let Some(secs) = lookup("FULFILLMENT_API_TIMEOUT_SECS") {
            config.api.timeout =
                Duration::from_secs(parse_var("FULFILLMENT_API_TIMEOUT_SECS", &secs)?);
        }

        config.webhook_secret = lookup("WEBHOOK_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Config("WEBHOOK_SECRET not set".to_string()))?;

        if let Some(rate) = lookup("CURRENCY_RATE") {
            let rate: Decimal = parse_var("CURRENCY_RATE", &rate)?;
            if rate <= Decimal::ZERO {
                return Err(BridgeError::Config("CURRENCY_RATE must be positive".to_string()));
            }
            config.conversion.currency_rate = rate;
        }
        if let Some(fee) = lookup("HANDLING_FEE") {
            config.conversion.handling_fee = parse_var("HANDLING_FEE", &fee)?;
        }
        if let Some(flag) = lookup("AUTO_SHIP") {
            config.auto_ship = parse_var("AUTO_SHIP", &flag)?;
        }
        if let Some(flag) = lookup("BRIDGE_DEBUG") {
            config.debug = parse_var("BRIDGE_DEBUG", &flag)?;
        }
        if let Some(map) = lookup("PRODUCT_CODE_MAP") {
            config.conversion.product_codes = parse_product_codes(&map)?;
        }

        Ok(config)
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = secret.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api.token = token.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.api.timeout = timeout;
        self
    }

    pub fn with_currency_rate(mut self, rate: Decimal) -> Self {
        self.conversion.currency_rate = rate;
        self
    }

    pub fn with_sender(mut self, sender: SenderAddress) -> Self {
        self.conversion.sender = sender;
        self
    }

    pub fn with_auto_ship(mut self, auto_ship: bool) -> Self {
        self.auto_ship = auto_ship;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BridgeError::Config(format!("invalid value for {key}: '{raw}'")))
}

fn parse_product_codes(raw: &str) -> Result<HashMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((id, code)) if !id.trim().is_empty() && !code.trim().is_empty() => {
                Ok((id.trim().to_string(), code.trim().to_string()))
            }
            _ => Err(BridgeError::Config(format!(
                "invalid PRODUCT_CODE_MAP entry '{pair}'"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_secret() {
        let config =
            BridgeConfig::from_lookup(lookup_from(&[("WEBHOOK_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.webhook_secret, "s3cret");
        assert_eq!(config.conversion.currency_rate, DEFAULT_CURRENCY_RATE);
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert!(config.auto_ship);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let result = BridgeConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            ("WEBHOOK_SECRET", "s"),
            ("FULFILLMENT_API_BASE_URL", "http://localhost:9000/api/"),
            ("FULFILLMENT_API_TIMEOUT_SECS", "5"),
            ("CURRENCY_RATE", "148.25"),
            ("AUTO_SHIP", "false"),
            ("PRODUCT_CODE_MAP", "P1=SKU-001, P2=SKU-002"),
        ]))
        .unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000/api");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.conversion.currency_rate, dec!(148.25));
        assert!(!config.auto_ship);
        assert_eq!(config.conversion.product_codes["P2"], "SKU-002");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("CURRENCY_RATE", "abc"),
            ("CURRENCY_RATE", "-1"),
            ("AUTO_SHIP", "maybe"),
            ("PRODUCT_CODE_MAP", "P1"),
        ] {
            let result =
                BridgeConfig::from_lookup(lookup_from(&[("WEBHOOK_SECRET", "s"), (key, value)]));
            assert!(matches!(result, Err(BridgeError::Config(_))), "{key}={value}");
        }
    }
}
