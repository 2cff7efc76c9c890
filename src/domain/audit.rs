use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    MissingFields,
    SignatureMismatch,
}

/// Forensic record of a webhook verification attempt, written whether or not
/// verification succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub outcome: VerificationOutcome,
    pub order_reference: Option<String>,
    pub status: Option<String>,
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub detail: Option<String>,
    pub payload: serde_json::Value,
}
