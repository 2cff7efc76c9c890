use super::audit::AuditEntry;
use super::address::ShippingAddress;
use super::invoice::Invoice;
use super::product::Product;
use super::shipment::{ShipmentReceipt, ShipmentRequest};
use super::user::UserAccount;
use crate::error::{Result, ShipmentApiError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Invoice>>;

    /// Unconditional upsert. Bumps the stored revision.
    async fn store(&self, invoice: Invoice) -> Result<()>;

    /// Writes `invoice` only if the stored revision still equals `expected`.
    ///
    /// Returns `false` when another writer got there first. On success the stored
    /// copy carries revision `expected + 1`.
    async fn store_if_revision(&self, invoice: Invoice, expected: u64) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserAccount>>;
    async fn store(&self, user: UserAccount) -> Result<()>;

    /// Empties the user's active cart and stamps the purchase time.
    /// Returns `false` if the user does not exist.
    async fn clear_cart(&self, user_id: &str, purchased_at: DateTime<Utc>) -> Result<bool>;

    async fn default_address(&self, user_id: &str) -> Result<Option<ShippingAddress>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get(&self, product_id: &str) -> Result<Option<Product>>;
    async fn store(&self, product: Product) -> Result<()>;

    /// Adds `delta` to the stock level and returns the new level, or `None` if
    /// the product does not exist.
    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Option<i64>>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Submits shipment requests to the fulfillment provider.
#[async_trait]
pub trait FulfillmentApi: Send + Sync {
    async fn submit(
        &self,
        request: &ShipmentRequest,
    ) -> std::result::Result<ShipmentReceipt, ShipmentApiError>;
}

pub type InvoiceStoreBox = Box<dyn InvoiceStore>;
pub type UserStoreBox = Box<dyn UserStore>;
pub type ProductStoreBox = Box<dyn ProductStore>;
pub type AuditLogRef = Arc<dyn AuditLog>;
pub type FulfillmentApiBox = Box<dyn FulfillmentApi>;
