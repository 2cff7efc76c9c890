use super::best_effort::best_effort;
use super::verifier::VerifiedEvent;
use crate::domain::address::ShippingAddress;
use crate::domain::invoice::{CartSnapshot, Invoice, InvoiceStatus};
use crate::domain::ports::{InvoiceStoreBox, ProductStoreBox, UserStoreBox};
use crate::domain::shipment::ShipmentReceipt;
use crate::error::{BridgeError, Result, ShipmentApiError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// What a payment event did to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedAction {
    MarkedPaid,
    MarkedExpired,
    StatusUpdated,
    /// Duplicate or stale delivery; nothing changed.
    AlreadyProcessed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub invoice: Invoice,
    pub action: ProcessedAction,
}

/// Result of trying to reserve an invoice for submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentClaim {
    /// The caller owns the submission; carries the claimed invoice.
    Claimed(Invoice),
    AlreadyShipped { shipment_id: String },
    InProgress,
}

/// Owns invoice status transitions and the side effects that go with them.
///
/// Every operation re-reads the invoice before writing, and invoice writes are
/// conditional on the revision that was read, so concurrent duplicate
/// deliveries cannot both apply side effects.
pub struct OrderStateManager {
    invoices: InvoiceStoreBox,
    users: UserStoreBox,
    products: ProductStoreBox,
    /// A `submitting` marker older than this is considered abandoned.
    claim_ttl: Duration,
}

impl OrderStateManager {
    pub fn new(invoices: InvoiceStoreBox, users: UserStoreBox, products: ProductStoreBox) -> Self {
        Self {
            invoices,
            users,
            products,
            claim_ttl: Duration::seconds(60),
        }
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub async fn load_invoice(&self, invoice_id: &str) -> Result<Invoice> {
        self.invoices
            .get(invoice_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("invoice {invoice_id}")))
    }

    /// Applies a verified payment event to its invoice.
    pub async fn apply_event(&self, event: &VerifiedEvent) -> Result<TransitionOutcome> {
        let mut invoice = self.load_invoice(&event.order_id).await?;
        let revision = invoice.revision;

        if invoice.status.is_paid() || invoice.status == event.status {
            debug!(
                invoice_id = %invoice.id,
                current = %invoice.status,
                incoming = %event.status,
                "Ignoring duplicate payment event"
            );
            return Ok(TransitionOutcome {
                invoice,
                action: ProcessedAction::AlreadyProcessed,
            });
        }

        let now = Utc::now();
        let payload = event.raw_payload.clone();
        let action = match &event.status {
            InvoiceStatus::Paid | InvoiceStatus::Redirect => {
                invoice.mark_paid(now, payload);
                ProcessedAction::MarkedPaid
            }
            InvoiceStatus::Expired => {
                invoice.mark_expired(now, payload);
                ProcessedAction::MarkedExpired
            }
            other => {
                invoice.set_status(other.clone(), payload);
                ProcessedAction::StatusUpdated
            }
        };

        if !self
            .invoices
            .store_if_revision(invoice.clone(), revision)
            .await?
        {
            info!(invoice_id = %invoice.id, "Concurrent update won the race; event ignored");
            let current = self.load_invoice(&event.order_id).await?;
            return Ok(TransitionOutcome {
                invoice: current,
                action: ProcessedAction::AlreadyProcessed,
            });
        }
        invoice.revision = revision + 1;
        info!(invoice_id = %invoice.id, status = %invoice.status, ?action, "Invoice transitioned");

        if action == ProcessedAction::MarkedPaid {
            self.apply_paid_side_effects(&invoice, now).await?;
        }

        Ok(TransitionOutcome { invoice, action })
    }

    /// Clears the owner's cart and decrements stock. The paid status is already
    /// committed, so stock is decremented even when the cart write fails; that
    /// failure is returned afterwards.
    async fn apply_paid_side_effects(&self, invoice: &Invoice, now: DateTime<Utc>) -> Result<()> {
        let cart_cleared = match invoice.user_id.as_deref() {
            Some(user_id) => match self.users.clear_cart(user_id, now).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    warn!(
                        invoice_id = %invoice.id,
                        user_id,
                        "Owning user not found; no cart to clear"
                    );
                    Ok(())
                }
                Err(e) => {
                    error!(invoice_id = %invoice.id, user_id, error = %e, "Failed to clear cart");
                    Err(e)
                }
            },
            None => {
                warn!(invoice_id = %invoice.id, "Invoice has no owning user; cart not cleared");
                Ok(())
            }
        };

        if let Some(cart) = &invoice.cart_snapshot {
            self.decrement_stock(&invoice.id, cart).await;
        }
        cart_cleared
    }

    /// Decrements stock per cart line. Each line is isolated: a missing product or
    /// a failed write is logged and the remaining lines still apply.
    async fn decrement_stock(&self, invoice_id: &str, cart: &CartSnapshot) {
        for item in &cart.items {
            let (Some(product_id), Some(quantity)) = (item.id.as_deref(), item.quantity) else {
                warn!(invoice_id, ?item, "Skipping malformed cart line");
                continue;
            };
            let Some(delta) = quantity
                .round_dp(0)
                .to_i64()
                .filter(|q| *q > 0 && Decimal::from(*q) == quantity)
            else {
                warn!(invoice_id, product_id, %quantity, "Skipping non-integral quantity");
                continue;
            };

            match self.products.adjust_stock(product_id, -delta).await {
                Ok(Some(stock)) if stock < 0 => {
                    warn!(invoice_id, product_id, stock, "Stock went negative (oversold)")
                }
                Ok(Some(stock)) => debug!(invoice_id, product_id, stock, "Stock decremented"),
                Ok(None) => {
                    warn!(invoice_id, product_id, "Product not found; stock not decremented")
                }
                Err(e) => warn!(invoice_id, product_id, error = %e, "Stock decrement failed"),
            }
        }
    }

    /// Shipping snapshot when present, otherwise the owner's default address.
    pub async fn resolve_address(&self, invoice: &Invoice) -> Result<ShippingAddress> {
        if let Some(snapshot) = &invoice.shipping_snapshot {
            return Ok(snapshot.clone());
        }
        let user_id = invoice.user_id.as_deref().ok_or_else(|| {
            BridgeError::NotFound(format!("shipping address for invoice {}", invoice.id))
        })?;
        self.users
            .default_address(user_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("default address for user {user_id}")))
    }

    /// Reserves the invoice for a provider submission.
    pub async fn claim_shipment(&self, invoice_id: &str) -> Result<ShipmentClaim> {
        let mut invoice = self.load_invoice(invoice_id).await?;
        if let Some(shipment_id) = invoice.shipment_id.clone() {
            return Ok(ShipmentClaim::AlreadyShipped { shipment_id });
        }

        let now = Utc::now();
        if invoice.is_submitting() {
            let stale = invoice
                .submission_started_at
                .is_none_or(|started| now - started > self.claim_ttl);
            if !stale {
                return Ok(ShipmentClaim::InProgress);
            }
            warn!(invoice_id, "Reclaiming abandoned shipment submission");
        }

        let revision = invoice.revision;
        invoice.begin_submission(now);
        if !self
            .invoices
            .store_if_revision(invoice.clone(), revision)
            .await?
        {
            return Ok(ShipmentClaim::InProgress);
        }
        invoice.revision = revision + 1;
        Ok(ShipmentClaim::Claimed(invoice))
    }

    /// Records a successful submission. Best effort: a failed write is logged and
    /// swallowed so it cannot hide the shipment that was created.
    pub async fn record_shipment_success(
        &self,
        invoice_id: &str,
        receipt: &ShipmentReceipt,
    ) -> bool {
        best_effort("record shipment success", async {
            let mut invoice = self.load_invoice(invoice_id).await?;
            if !invoice.record_shipment(receipt.id.clone(), receipt.status.clone(), Utc::now()) {
                warn!(
                    invoice_id,
                    existing = ?invoice.shipment_id,
                    received = %receipt.id,
                    "Invoice already holds a shipment id; keeping the original"
                );
                return Ok(false);
            }
            self.invoices.store(invoice).await?;
            info!(
                invoice_id,
                shipment_id = %receipt.id,
                status = %receipt.status,
                "Shipment recorded"
            );
            Ok(true)
        })
        .await
        .unwrap_or(false)
    }

    /// Records a failed submission. Best effort, like the success path.
    pub async fn record_shipment_failure(
        &self,
        invoice_id: &str,
        error: &ShipmentApiError,
    ) -> bool {
        best_effort("record shipment failure", async {
            let mut invoice = self.load_invoice(invoice_id).await?;
            invoice.record_shipment_failure(error.compact());
            self.invoices.store(invoice).await?;
            info!(invoice_id, error_type = error.error_type(), "Shipment failure recorded");
            Ok(true)
        })
        .await
        .unwrap_or(false)
    }
}
