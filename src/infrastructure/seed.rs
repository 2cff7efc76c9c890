use crate::domain::invoice::Invoice;
use crate::domain::ports::{InvoiceStore, ProductStore, UserStore};
use crate::domain::product::Product;
use crate::domain::user::UserAccount;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Documents loaded into the stores at startup, for demos and local runs.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl SeedData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Upserts every document. Invoice revisions are assigned by the store.
    pub async fn apply(
        self,
        invoices: &dyn InvoiceStore,
        users: &dyn UserStore,
        products: &dyn ProductStore,
    ) -> Result<()> {
        let counts = (self.invoices.len(), self.users.len(), self.products.len());
        for invoice in self.invoices {
            invoices.store(invoice).await?;
        }
        for user in self.users {
            users.store(user).await?;
        }
        for product in self.products {
            products.store(product).await?;
        }
        info!(
            invoices = counts.0,
            users = counts.1,
            products = counts.2,
            "Seed data loaded"
        );
        Ok(())
    }
}
