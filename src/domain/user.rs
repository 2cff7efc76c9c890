use super::address::ShippingAddress;
use super::invoice::CartItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The parts of a customer record the bridge reads or writes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    /// Active cart, emptied once a payment is confirmed.
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_purchase_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub addresses: Vec<ShippingAddress>,
}

impl UserAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn clear_cart(&mut self, purchased_at: DateTime<Utc>) {
        self.cart.clear();
        self.last_purchase_at = Some(purchased_at);
    }

    pub fn default_address(&self) -> Option<&ShippingAddress> {
        self.addresses.iter().find(|a| a.is_default)
    }
}
