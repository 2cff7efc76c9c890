use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

use crate::error::ConversionError;

/// Domestic carriers accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomesticCarrier {
    Yamato,
    Sagawa,
    Japanpost,
}

impl FromStr for DomesticCarrier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YAMATO" => Ok(Self::Yamato),
            "SAGAWA" => Ok(Self::Sagawa),
            "JAPANPOST" => Ok(Self::Japanpost),
            _ => Err(ConversionError::Unsupported {
                kind: "delivery carrier",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    PostExpress,
    HomeBox,
}

impl FromStr for DeliveryMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POST_EXPRESS" => Ok(Self::PostExpress),
            "HOME_BOX" => Ok(Self::HomeBox),
            _ => Err(ConversionError::Unsupported {
                kind: "delivery method",
                value: s.to_string(),
            }),
        }
    }
}

/// International services; the provider picks the carrier from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternationalService {
    #[serde(rename = "SAGAWA-HIKYAKU-YU-PACKET")]
    SagawaHikyakuYuPacket,
    #[serde(rename = "JAPANPOST-EMS")]
    JapanpostEms,
    #[serde(rename = "JAPANPOST-EPACKET")]
    JapanpostEpacket,
    #[serde(rename = "FEDEX-PRIORITY")]
    FedexPriority,
    #[serde(rename = "DHL-EXPRESS")]
    DhlExpress,
}

impl FromStr for InternationalService {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAGAWA-HIKYAKU-YU-PACKET" => Ok(Self::SagawaHikyakuYuPacket),
            "JAPANPOST-EMS" => Ok(Self::JapanpostEms),
            "JAPANPOST-EPACKET" => Ok(Self::JapanpostEpacket),
            "FEDEX-PRIORITY" => Ok(Self::FedexPriority),
            "DHL-EXPRESS" => Ok(Self::DhlExpress),
            _ => Err(ConversionError::Unsupported {
                kind: "delivery service",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderAddress {
    pub postcode: String,
    pub prefecture: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomesticRecipient {
    pub name: String,
    pub postcode: String,
    pub prefecture: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternationalRecipient {
    pub name: String,
    pub region_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub city: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub postcode: String,
    pub phone: String,
}

/// Destination-dependent part of a shipment request.
///
/// Serialises flat into the request body together with the `international` flag,
/// which is how the provider discriminates the two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentDestination {
    Domestic {
        recipient: DomesticRecipient,
        delivery_carrier: Option<DomesticCarrier>,
        delivery_method: Option<DeliveryMethod>,
    },
    International {
        recipient: InternationalRecipient,
        delivery_service: Option<InternationalService>,
    },
}

impl ShipmentDestination {
    pub fn is_international(&self) -> bool {
        matches!(self, ShipmentDestination::International { .. })
    }
}

impl Serialize for ShipmentDestination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            ShipmentDestination::Domestic {
                recipient,
                delivery_carrier,
                delivery_method,
            } => {
                map.serialize_entry("international", &false)?;
                map.serialize_entry("recipient", recipient)?;
                if let Some(carrier) = delivery_carrier {
                    map.serialize_entry("delivery_carrier", carrier)?;
                }
                if let Some(method) = delivery_method {
                    map.serialize_entry("delivery_method", method)?;
                }
            }
            ShipmentDestination::International {
                recipient,
                delivery_service,
            } => {
                map.serialize_entry("international", &true)?;
                map.serialize_entry("recipient", recipient)?;
                if let Some(service) = delivery_service {
                    map.serialize_entry("delivery_service", service)?;
                }
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentItem {
    pub code: String,
    pub quantity: u32,
}

/// The provider-facing shipment request. Amounts are integer units of the
/// destination currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentRequest {
    pub identifier: String,
    pub order_no: String,
    pub subtotal_amount: i64,
    pub delivery_charge: i64,
    pub handling_charge: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub cushioning_unit: String,
    pub cushioning_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_wrapping_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_wrapping_type: Option<String>,
    pub items: Vec<ShipmentItem>,
    pub sender: SenderAddress,
    #[serde(flatten)]
    pub destination: ShipmentDestination,
}

/// Currency conversion applied while building a request, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub original_amount: Decimal,
    pub original_currency: String,
    pub converted_amount: i64,
    pub destination_currency: String,
    pub rate: Decimal,
}

/// Successful provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentReceipt {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub identifier: String,
    pub order_no: String,
    pub status: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
