//! Application layer: the payment-to-shipment pipeline.
//!
//! `FulfillmentOrchestrator` is the entry point. It composes the webhook
//! verifier, the order state manager, the validator, the payload converter and a
//! `FulfillmentApi` implementation. Each request runs sequentially on its own
//! task; the only shared state is the document store behind the ports.

pub mod best_effort;
pub mod converter;
pub mod orchestrator;
pub mod state;
pub mod validator;
pub mod verifier;
