use crate::domain::audit::{AuditEntry, VerificationOutcome};
use crate::domain::invoice::InvoiceStatus;
use crate::domain::ports::AuditLogRef;
use crate::error::VerificationError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sha2::Sha256;
use std::str::FromStr;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const FIELD_ORDER_REFERENCE: &str = "order_reference";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_SIGNATURE: &str = "signature";

const REQUIRED_FIELDS: [&str; 3] = [FIELD_ORDER_REFERENCE, FIELD_SIGNATURE, FIELD_STATUS];

/// Fields covered by the signature, in canonical (lexicographic) order.
const SIGNED_FIELDS: [&str; 5] = ["amount", "currency", "fee", FIELD_ORDER_REFERENCE, FIELD_STATUS];

/// A payment event whose origin has been established.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    pub order_id: String,
    pub status: InvoiceStatus,
    pub raw_payload: Value,
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
}

pub struct WebhookVerifier {
    secret: String,
    audit: AuditLogRef,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, audit: AuditLogRef) -> Self {
        Self {
            secret: secret.into(),
            audit,
        }
    }

    /// Verifies required fields and signature, then writes an audit record
    /// regardless of the result.
    pub async fn verify(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<VerifiedEvent, VerificationError> {
        let result = self.check(payload);

        let (outcome, detail) = match &result {
            Ok(_) => (VerificationOutcome::Verified, None),
            Err(e @ VerificationError::MissingFields(_)) => {
                (VerificationOutcome::MissingFields, Some(e.to_string()))
            }
            Err(e @ VerificationError::SignatureMismatch) => {
                (VerificationOutcome::SignatureMismatch, Some(e.to_string()))
            }
        };
        let entry = AuditEntry {
            at: Utc::now(),
            outcome,
            order_reference: field_text(payload, FIELD_ORDER_REFERENCE),
            status: field_text(payload, FIELD_STATUS),
            amount: decimal_field(payload, "amount"),
            fee: decimal_field(payload, "fee"),
            detail,
            payload: redacted(payload),
        };
        if let Err(e) = self.audit.record(entry).await {
            warn!(error = %e, "Failed to write webhook audit record");
        }

        match &result {
            Ok(event) => info!(
                invoice_id = %event.order_id,
                status = %event.status,
                amount = ?event.amount,
                fee = ?event.fee,
                "Webhook verified"
            ),
            Err(e) => warn!(
                order_reference = ?field_text(payload, FIELD_ORDER_REFERENCE),
                error = %e,
                "Webhook rejected"
            ),
        }
        result
    }

    fn check(&self, payload: &Map<String, Value>) -> Result<VerifiedEvent, VerificationError> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| field_text(payload, field).is_none())
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(VerificationError::MissingFields(missing));
        }

        let provided = field_text(payload, FIELD_SIGNATURE).unwrap_or_default();
        let provided =
            hex::decode(provided.trim()).map_err(|_| VerificationError::SignatureMismatch)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| VerificationError::SignatureMismatch)?;
        mac.update(canonical_message(payload).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| VerificationError::SignatureMismatch)?;

        Ok(VerifiedEvent {
            order_id: field_text(payload, FIELD_ORDER_REFERENCE).unwrap_or_default(),
            status: InvoiceStatus::from(field_text(payload, FIELD_STATUS).unwrap_or_default()),
            raw_payload: Value::Object(payload.clone()),
            amount: decimal_field(payload, "amount"),
            fee: decimal_field(payload, "fee"),
        })
    }
}

/// Computes the lowercase hex signature the verifier expects for `payload`.
pub fn sign_payload(secret: &str, payload: &Map<String, Value>) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(canonical_message(payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `key=value` pairs of the signed fields that are present, joined by `&`.
fn canonical_message(payload: &Map<String, Value>) -> String {
    SIGNED_FIELDS
        .iter()
        .filter_map(|field| value_text(payload.get(*field)?).map(|v| format!("{field}={v}")))
        .collect::<Vec<_>>()
        .join("&")
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-empty textual value of a top-level field.
fn field_text(payload: &Map<String, Value>, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(value_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn decimal_field(payload: &Map<String, Value>, field: &str) -> Option<Decimal> {
    field_text(payload, field).and_then(|s| Decimal::from_str(&s).ok())
}

/// Payload copy for the audit trail, with the signature masked.
fn redacted(payload: &Map<String, Value>) -> Value {
    let mut copy = payload.clone();
    if copy.contains_key(FIELD_SIGNATURE) {
        copy.insert(FIELD_SIGNATURE.to_string(), Value::String("[redacted]".to_string()));
    }
    Value::Object(copy)
}
