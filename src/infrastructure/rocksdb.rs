use crate::domain::address::ShippingAddress;
use crate::domain::invoice::Invoice;
use crate::domain::ports::{InvoiceStore, ProductStore, UserStore};
use crate::domain::product::Product;
use crate::domain::user::UserAccount;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for invoice documents.
pub const CF_INVOICES: &str = "invoices";
/// Column Family for user documents (cart and addresses).
pub const CF_USERS: &str = "users";
/// Column Family for product documents (stock levels).
pub const CF_PRODUCTS: &str = "products";

/// A persistent document store backed by RocksDB.
///
/// Each collection lives in its own Column Family with JSON values keyed by
/// document id. Read-modify-write operations (conditional invoice writes, cart
/// clearing, stock adjustment) are serialised through a process-wide write lock.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// `invoices`, `users` and `products` column families when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_INVOICES, CF_USERS, CF_PRODUCTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            BridgeError::Storage(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let doc = serde_json::from_slice(&bytes).map_err(|e| {
                    BridgeError::Storage(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Deserialization error in {cf_name}/{key}: {e}"),
                    )))
                })?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &str, doc: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let value = serde_json::to_vec(doc).map_err(|e| {
            BridgeError::Storage(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error in {cf_name}/{key}: {e}"),
            )))
        })?;
        self.db.put_cf(&cf, key.as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for RocksDBStore {
    async fn get(&self, id: &str) -> Result<Option<Invoice>> {
        self.read(CF_INVOICES, id)
    }

    async fn store(&self, mut invoice: Invoice) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let current: Option<Invoice> = self.read(CF_INVOICES, &invoice.id)?;
        invoice.revision = current.map_or(0, |i| i.revision) + 1;
        self.write(CF_INVOICES, &invoice.id, &invoice)
    }

    async fn store_if_revision(&self, mut invoice: Invoice, expected: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current: Option<Invoice> = self.read(CF_INVOICES, &invoice.id)?;
        if current.map_or(0, |i| i.revision) != expected {
            return Ok(false);
        }
        invoice.revision = expected + 1;
        self.write(CF_INVOICES, &invoice.id, &invoice)?;
        Ok(true)
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserAccount>> {
        self.read(CF_USERS, user_id)
    }

    async fn store(&self, user: UserAccount) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(CF_USERS, &user.id, &user)
    }

    async fn clear_cart(&self, user_id: &str, purchased_at: DateTime<Utc>) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut user) = self.read::<UserAccount>(CF_USERS, user_id)? else {
            return Ok(false);
        };
        user.clear_cart(purchased_at);
        self.write(CF_USERS, user_id, &user)?;
        Ok(true)
    }

    async fn default_address(&self, user_id: &str) -> Result<Option<ShippingAddress>> {
        let user: Option<UserAccount> = self.read(CF_USERS, user_id)?;
        Ok(user.and_then(|u| u.default_address().cloned()))
    }
}

#[async_trait]
impl ProductStore for RocksDBStore {
    async fn get(&self, product_id: &str) -> Result<Option<Product>> {
        self.read(CF_PRODUCTS, product_id)
    }

    async fn store(&self, product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(CF_PRODUCTS, &product.id, &product)
    }

    async fn adjust_stock(&self, product_id: &str, delta: i64) -> Result<Option<i64>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut product) = self.read::<Product>(CF_PRODUCTS, product_id)? else {
            return Ok(None);
        };
        product.stock += delta;
        self.write(CF_PRODUCTS, product_id, &product)?;
        Ok(Some(product.stock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invoice::InvoiceStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_INVOICES).is_some());
        assert!(store.db.cf_handle(CF_USERS).is_some());
        assert!(store.db.cf_handle(CF_PRODUCTS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_invoice_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        InvoiceStore::store(&store, Invoice::new("ORD-1")).await.unwrap();
        let mut invoice = InvoiceStore::get(&store, "ORD-1").await.unwrap().unwrap();
        assert_eq!(invoice.revision, 1);

        invoice.status = InvoiceStatus::Redirect;
        assert!(store.store_if_revision(invoice.clone(), 1).await.unwrap());
        assert!(!store.store_if_revision(invoice, 1).await.unwrap());

        let stored = InvoiceStore::get(&store, "ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Redirect);
        assert_eq!(stored.revision, 2);
        assert!(InvoiceStore::get(&store, "ORD-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_product_and_user_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        ProductStore::store(&store, Product::new("P1", 2)).await.unwrap();
        assert_eq!(store.adjust_stock("P1", -3).await.unwrap(), Some(-1));
        assert_eq!(store.adjust_stock("P2", -1).await.unwrap(), None);

        UserStore::store(&store, UserAccount::new("U1")).await.unwrap();
        assert!(store.clear_cart("U1", Utc::now()).await.unwrap());
        let user = UserStore::get(&store, "U1").await.unwrap().unwrap();
        assert!(user.last_purchase_at.is_some());
        assert!(store.default_address("U1").await.unwrap().is_none());
    }
}
