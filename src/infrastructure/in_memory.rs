use crate::domain::address::ShippingAddress;
use crate::domain::audit::AuditEntry;
use crate::domain::invoice::Invoice;
use crate::domain::ports::{AuditLog, InvoiceStore, ProductStore, UserStore};
use crate::domain::product::Product;
use crate::domain::user::UserAccount;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory invoice collection.
///
/// Conditional writes check and insert under the same write lock, so they are
/// atomic with respect to every other writer sharing the store.
#[derive(Default, Clone)]
pub struct InMemoryInvoiceStore {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
}

impl InMemoryInvoiceStore {
    /// Creates a new, empty in-memory invoice store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn get(&self, id: &str) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(id).cloned())
    }

    async fn store(&self, mut invoice: Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        invoice.revision = invoices.get(&invoice.id).map_or(0, |i| i.revision) + 1;
        invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn store_if_revision(&self, mut invoice: Invoice, expected: u64) -> Result<bool> {
        let mut invoices = self.invoices.write().await;
        let current = invoices.get(&invoice.id).map_or(0, |i| i.revision);
        if current != expected {
            return Ok(false);
        }
        invoice.revision = expected + 1;
        invoices.insert(invoice.id.clone(), invoice);
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserAccount>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserAccount>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn store(&self, user: UserAccount) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str, purchased_at: DateTime<Utc>) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(user_id) {
            Some(user) => {
                user.clear_cart(purchased_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn default_address(&self, user_id: &str) -> Result<Option<ShippingAddress>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|u| u.default_address())
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get(&self, product_id: &str) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(product_id).cloned())
    }

    async fn store(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Option<i64>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(product_id).map(|p| {
            p.stock += delta;
            p.stock
        }))
    }
}

/// Collects audit entries in memory. Used in tests and by the CLI preview.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invoice::InvoiceStatus;

    #[tokio::test]
    async fn test_in_memory_invoice_store() {
        let store = InMemoryInvoiceStore::new();
        store.store(Invoice::new("ORD-1")).await.unwrap();

        let retrieved = store.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "ORD-1");
        assert_eq!(retrieved.revision, 1);
        assert!(store.get("ORD-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_write() {
        let store = InMemoryInvoiceStore::new();
        store.store(Invoice::new("ORD-1")).await.unwrap();

        let mut first = store.get("ORD-1").await.unwrap().unwrap();
        let mut second = first.clone();
        first.status = InvoiceStatus::Redirect;
        second.status = InvoiceStatus::Expired;

        assert!(store.store_if_revision(first, 1).await.unwrap());
        assert!(!store.store_if_revision(second, 1).await.unwrap());

        let stored = store.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Redirect);
        assert_eq!(stored.revision, 2);
    }

    #[tokio::test]
    async fn test_concurrent_conditional_writes_have_one_winner() {
        let store = InMemoryInvoiceStore::new();
        store.store(Invoice::new("ORD-1")).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let invoice = store.get("ORD-1").await.unwrap().unwrap();
                    store.store_if_revision(invoice, 1).await.unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_product_stock_adjustment() {
        let store = InMemoryProductStore::new();
        store.store(Product::new("P1", 3)).await.unwrap();

        assert_eq!(store.adjust_stock("P1", -5).await.unwrap(), Some(-2));
        assert_eq!(store.adjust_stock("P9", -1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_store_clear_cart() {
        let store = InMemoryUserStore::new();
        let mut user = UserAccount::new("U1");
        user.cart.push(Default::default());
        store.store(user).await.unwrap();

        assert!(store.clear_cart("U1", Utc::now()).await.unwrap());
        assert!(!store.clear_cart("U2", Utc::now()).await.unwrap());
        assert!(store.get("U1").await.unwrap().unwrap().cart.is_empty());
    }
}
