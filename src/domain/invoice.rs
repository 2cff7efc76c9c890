use super::address::ShippingAddress;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an invoice.
///
/// Statuses the bridge does not model explicitly are carried verbatim in
/// `Other` so a provider-specific status survives a round trip through storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    /// Payment confirmed and post-payment side effects applied.
    Redirect,
    Expired,
    Cancelled,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Redirect => "redirect",
            InvoiceStatus::Expired => "expired",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Other(s) => s,
        }
    }

    /// True once payment has been confirmed; further payment events are ignored.
    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Redirect)
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => InvoiceStatus::Pending,
            "paid" => InvoiceStatus::Paid,
            "redirect" => InvoiceStatus::Redirect,
            "expired" => InvoiceStatus::Expired,
            "cancelled" | "canceled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Other(value),
        }
    }
}

impl From<&str> for InvoiceStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line of a cart as captured at checkout. Fields stay optional because the
/// snapshot is written by an external checkout flow; the validator reports gaps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
}

impl CartItem {
    pub fn new(id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            id: Some(id.into()),
            quantity: Some(quantity),
        }
    }
}

/// Immutable copy of the cart taken at checkout. Amounts are in the reference currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
}

/// Provider-status values written by the bridge itself.
pub const FULFILLMENT_SUBMITTING: &str = "submitting";
pub const FULFILLMENT_FAILED: &str = "failed";

/// An order tracked through payment and shipment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Amount charged, in the reference currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_snapshot: Option<CartSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_snapshot: Option<ShippingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_started_at: Option<DateTime<Utc>>,
    /// Write counter used for conditional updates. Bumped by the store.
    #[serde(default)]
    pub revision: u64,
}

impl Invoice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Marks payment confirmed. Post-payment side effects are the caller's job.
    pub fn mark_paid(&mut self, at: DateTime<Utc>, payload: serde_json::Value) {
        self.status = InvoiceStatus::Redirect;
        self.paid_at = Some(at);
        self.webhook_payload = Some(payload);
    }

    pub fn mark_expired(&mut self, at: DateTime<Utc>, payload: serde_json::Value) {
        self.status = InvoiceStatus::Expired;
        self.expired_at = Some(at);
        self.webhook_payload = Some(payload);
    }

    pub fn set_status(&mut self, status: InvoiceStatus, payload: serde_json::Value) {
        self.status = status;
        self.webhook_payload = Some(payload);
    }

    pub fn is_submitting(&self) -> bool {
        self.fulfillment_status.as_deref() == Some(FULFILLMENT_SUBMITTING)
    }

    pub fn begin_submission(&mut self, at: DateTime<Utc>) {
        self.fulfillment_status = Some(FULFILLMENT_SUBMITTING.to_string());
        self.submission_started_at = Some(at);
    }

    /// Attaches the provider's shipment id.
    ///
    /// Returns `false` without touching the invoice when a shipment id is already
    /// present: an invoice ships at most once.
    pub fn record_shipment(
        &mut self,
        shipment_id: String,
        provider_status: String,
        at: DateTime<Utc>,
    ) -> bool {
        if self.shipment_id.is_some() {
            return false;
        }
        self.shipment_id = Some(shipment_id);
        self.shipped_at = Some(at);
        self.fulfillment_status = Some(provider_status);
        self.shipment_error = None;
        self.submission_started_at = None;
        true
    }

    pub fn record_shipment_failure(&mut self, error: String) {
        if self.shipment_id.is_some() {
            return;
        }
        self.fulfillment_status = Some(FULFILLMENT_FAILED.to_string());
        self.shipment_error = Some(error);
        self.submission_started_at = None;
    }
}
