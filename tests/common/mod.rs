#![allow(dead_code)]

use async_trait::async_trait;
use fulfillment_bridge::application::converter::PayloadConverter;
use fulfillment_bridge::application::orchestrator::FulfillmentOrchestrator;
use fulfillment_bridge::application::state::OrderStateManager;
use fulfillment_bridge::application::verifier::{WebhookVerifier, sign_payload};
use fulfillment_bridge::config::ConversionConfig;
use fulfillment_bridge::domain::address::{RecipientRecord, ShippingAddress, ShippingRequestRecord};
use fulfillment_bridge::domain::invoice::{CartItem, CartSnapshot, Invoice, InvoiceStatus};
use fulfillment_bridge::domain::ports::{FulfillmentApi, InvoiceStore, ProductStore, UserStore};
use fulfillment_bridge::domain::product::Product;
use fulfillment_bridge::domain::shipment::{ShipmentReceipt, ShipmentRequest};
use fulfillment_bridge::domain::user::UserAccount;
use fulfillment_bridge::error::ShipmentApiError;
use fulfillment_bridge::infrastructure::in_memory::{
    InMemoryAuditLog, InMemoryInvoiceStore, InMemoryProductStore, InMemoryUserStore,
};
use rust_decimal_macros::dec;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub const SECRET: &str = "whsec_test";

pub fn domestic_address() -> ShippingAddress {
    ShippingAddress {
        id: Some("addr-1".into()),
        is_default: true,
        shipping_request: Some(ShippingRequestRecord {
            international: Some(false),
            recipient: Some(RecipientRecord {
                name: Some("Taro Yamada".into()),
                postcode: Some("1500001".into()),
                phone: Some("0312345678".into()),
                address1: Some("Shibuya-ku Jingumae 1-1".into()),
                prefecture: Some("Tokyo".into()),
                ..Default::default()
            }),
            delivery_carrier: Some("YAMATO".into()),
            delivery_method: Some("HOME_BOX".into()),
            shipping_fee: Some(dec!(15)),
            ..Default::default()
        }),
    }
}

/// Pending invoice ORD-1 owned by U1: two units of P1, 0.3 USD of which 0.2 is
/// merchandise.
pub fn pending_invoice(id: &str) -> Invoice {
    Invoice {
        session_id: Some(format!("cs_{id}")),
        user_id: Some("U1".into()),
        amount: Some(dec!(0.3)),
        status: InvoiceStatus::Pending,
        cart_snapshot: Some(CartSnapshot {
            items: vec![CartItem::new("P1", dec!(2))],
            subtotal: Some(dec!(0.2)),
            discount: None,
        }),
        shipping_snapshot: Some(domestic_address()),
        ..Invoice::new(id)
    }
}

pub fn signed_event(order_reference: &str, status: &str) -> Map<String, Value> {
    let mut payload = json!({
        "order_reference": order_reference,
        "status": status,
        "amount": "0.30",
        "currency": "USD",
        "fee": "0.01",
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    let signature = sign_payload(SECRET, &payload);
    payload.insert("signature".into(), Value::String(signature));
    payload
}

pub fn receipt(identifier: &str) -> ShipmentReceipt {
    ShipmentReceipt {
        id: "SHP-1001".into(),
        identifier: identifier.into(),
        order_no: format!("cs_{identifier}"),
        status: "WAITING".into(),
    }
}

/// A `FulfillmentApi` double that counts calls and returns a canned outcome.
#[derive(Clone)]
pub struct CountingApi {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ShipmentRequest>>>,
    outcome: Result<ShipmentReceipt, ShipmentApiError>,
}

impl CountingApi {
    pub fn accepting() -> Self {
        Self::with_outcome(Ok(receipt("ORD-1")))
    }

    pub fn with_outcome(outcome: Result<ShipmentReceipt, ShipmentApiError>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            outcome,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<ShipmentRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl FulfillmentApi for CountingApi {
    async fn submit(&self, request: &ShipmentRequest) -> Result<ShipmentReceipt, ShipmentApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        // Give a concurrent caller a chance to interleave.
        tokio::task::yield_now().await;
        self.outcome.clone()
    }
}

/// In-memory stores seeded with ORD-1, user U1 (cart with P1) and P1 at stock 10.
pub struct World {
    pub invoices: InMemoryInvoiceStore,
    pub users: InMemoryUserStore,
    pub products: InMemoryProductStore,
    pub audit: InMemoryAuditLog,
}

impl World {
    pub async fn seeded() -> Self {
        let world = Self {
            invoices: InMemoryInvoiceStore::new(),
            users: InMemoryUserStore::new(),
            products: InMemoryProductStore::new(),
            audit: InMemoryAuditLog::new(),
        };

        world.invoices.store(pending_invoice("ORD-1")).await.unwrap();

        let mut user = UserAccount::new("U1");
        user.cart.push(CartItem::new("P1", dec!(2)));
        user.addresses.push(domestic_address());
        world.users.store(user).await.unwrap();

        world.products.store(Product::new("P1", 10)).await.unwrap();
        world
    }

    pub fn orchestrator(&self, api: CountingApi, auto_ship: bool) -> FulfillmentOrchestrator {
        let verifier = WebhookVerifier::new(SECRET, Arc::new(self.audit.clone()));
        let state = OrderStateManager::new(
            Box::new(self.invoices.clone()),
            Box::new(self.users.clone()),
            Box::new(self.products.clone()),
        );
        FulfillmentOrchestrator::new(
            verifier,
            state,
            PayloadConverter::new(ConversionConfig::default()),
            Box::new(api),
            auto_ship,
        )
    }

    pub async fn invoice(&self, id: &str) -> Invoice {
        InvoiceStore::get(&self.invoices, id).await.unwrap().unwrap()
    }

    pub async fn stock(&self, product_id: &str) -> i64 {
        ProductStore::get(&self.products, product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    pub async fn user(&self, user_id: &str) -> UserAccount {
        UserStore::get(&self.users, user_id).await.unwrap().unwrap()
    }
}
