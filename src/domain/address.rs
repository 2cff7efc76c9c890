use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Recipient as captured from the storefront. Every field is optional at this
/// level: the domestic and international shapes require different subsets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipientRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    /// Domestic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefecture: Option<String>,
    /// International only (ISO 3166-1 alpha-2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShippingRequestRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub international: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_service: Option<String>,
    /// Quoted shipping fee, already in the destination currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_fee: Option<Decimal>,
    #[serde(default)]
    pub gift_wrapping: bool,
}

/// A delivery address, either snapshotted on an invoice or stored on a user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_request: Option<ShippingRequestRecord>,
}

/// Returns the trimmed value when present and non-blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_document_shape() {
        let doc = json!({
            "isDefault": true,
            "shippingRequest": {
                "international": false,
                "recipient": { "name": "Taro", "prefecture": "Tokyo" },
                "shipping_fee": 15
            }
        });
        let address: ShippingAddress = serde_json::from_value(doc).unwrap();
        assert!(address.is_default);
        let request = address.shipping_request.unwrap();
        assert_eq!(request.international, Some(false));
        assert!(!request.gift_wrapping);
        assert_eq!(
            request.recipient.unwrap().prefecture.as_deref(),
            Some("Tokyo")
        );
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&Some("  x ".into())), Some("x"));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&None), None);
    }
}
