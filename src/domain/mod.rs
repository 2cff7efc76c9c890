//! Domain records and the ports the application layer talks to.

pub mod address;
pub mod audit;
pub mod invoice;
pub mod ports;
pub mod product;
pub mod shipment;
pub mod user;
