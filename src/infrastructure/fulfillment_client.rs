//! HTTP client for the fulfillment provider's shipment API.
//!
//! One `POST {base_url}/shipments` per call, bearer-token authenticated, with a
//! bounded timeout. There is deliberately no retry loop here: a retried POST can
//! create a second shipment, so retrying is left to whoever owns the invoice.

use crate::config::FulfillmentApiConfig;
use crate::domain::ports::FulfillmentApi;
use crate::domain::shipment::{ShipmentReceipt, ShipmentRequest};
use crate::error::{BridgeError, Result, ShipmentApiError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

pub const API_VERSION_HEADER: &str = "X-Api-Version";

/// Short, user-safe messages for provider field errors. Numeric path segments
/// are normalised to `*` before lookup.
const FIELD_MESSAGES: &[(&str, &str)] = &[
    ("recipient.postcode", "Address and postcode mismatch"),
    ("recipient.address1", "Address could not be verified"),
    ("recipient.phone", "Invalid phone number"),
    ("recipient.name", "Recipient name is required"),
    ("recipient.prefecture", "Invalid prefecture"),
    ("recipient.region_code", "Destination country is not supported"),
    ("recipient.city", "Invalid city"),
    ("items", "Invalid item list"),
    ("items.*.code", "Unknown product code"),
    ("items.*.quantity", "Invalid item quantity"),
    ("identifier", "Order has already been submitted"),
    ("delivery_carrier", "Carrier is not available for this destination"),
    ("delivery_service", "Shipping service is not available for this destination"),
];

pub struct FulfillmentClient {
    client: Client,
    config: FulfillmentApiConfig,
}

impl FulfillmentClient {
    pub fn new(config: FulfillmentApiConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(BridgeError::Config(
                "fulfillment API base URL not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/shipments", self.config.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, e: reqwest::Error) -> ShipmentApiError {
        if e.is_timeout() {
            ShipmentApiError::Timeout(self.config.timeout.as_secs())
        } else {
            ShipmentApiError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl FulfillmentApi for FulfillmentClient {
    async fn submit(
        &self,
        request: &ShipmentRequest,
    ) -> std::result::Result<ShipmentReceipt, ShipmentApiError> {
        let endpoint = self.endpoint();
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.token)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let classified = self.transport_error(e);
                error!(
                    endpoint = %endpoint,
                    identifier = %request.identifier,
                    error = %classified,
                    "Shipment request failed"
                );
                classified
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            let receipt: ShipmentReceipt = serde_json::from_str(&body).map_err(|e| {
                ShipmentApiError::Protocol(format!(
                    "HTTP {} response missing id/identifier/order_no/status: {e}",
                    status.as_u16()
                ))
            })?;
            debug!(
                identifier = %receipt.identifier,
                shipment_id = %receipt.id,
                status = %receipt.status,
                "Shipment created"
            );
            return Ok(receipt);
        }

        let classified = classify_failure(status, &body);
        warn!(
            endpoint = %endpoint,
            status = %status,
            error_type = classified.error_type(),
            body = %body.chars().take(200).collect::<String>(),
            "Provider rejected shipment request"
        );
        Err(classified)
    }
}

/// Maps a non-2xx provider response to its error class.
pub fn classify_failure(status: StatusCode, body: &str) -> ShipmentApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            let text: String = body.chars().take(200).collect();
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShipmentApiError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let errors = parsed.as_ref().and_then(|v| v.get("errors"));
            let field_errors: BTreeMap<String, Value> = errors
                .and_then(Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();
            let message = match errors {
                Some(errors) => simplify_error(errors),
                None => message,
            };
            ShipmentApiError::Validation {
                status: status.as_u16(),
                message,
                field_errors,
            }
        }
        _ => ShipmentApiError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Collapses a provider `errors` value into a short message safe to show users.
pub fn simplify_error(errors: &Value) -> String {
    match errors.as_object() {
        Some(map) if !map.is_empty() => {
            let mut messages: Vec<String> = Vec::new();
            for field in map.keys() {
                let message = simplify_field(field);
                if !messages.contains(&message) {
                    messages.push(message);
                }
            }
            messages.join("; ")
        }
        _ => "Unknown error".to_string(),
    }
}

fn simplify_field(field: &str) -> String {
    let normalized = field
        .split('.')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "*"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(".");

    FIELD_MESSAGES
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, message)| message.to_string())
        .unwrap_or_else(|| format!("Invalid {field}"))
}
