//! Invoice to shipment-request conversion.
//!
//! Pure and deterministic: the same invoice, address and configuration always
//! produce the same request. Validation is not repeated here; the converter only
//! narrows the loose records into the typed request and fails with a
//! [`ConversionError`] when that is impossible.

use crate::config::{ConversionConfig, DESTINATION_CURRENCY, REFERENCE_CURRENCY};
use crate::domain::address::{RecipientRecord, ShippingAddress, ShippingRequestRecord, non_blank};
use crate::domain::invoice::{CartSnapshot, Invoice};
use crate::domain::shipment::{
    ConversionMetadata, DomesticRecipient, InternationalRecipient, ShipmentDestination,
    ShipmentItem, ShipmentRequest,
};
use crate::error::ConversionError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// A request ready for submission plus the conversion applied to build it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedShipment {
    pub request: ShipmentRequest,
    pub conversion: ConversionMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Financials {
    subtotal: i64,
    delivery: i64,
    handling: i64,
    discount: i64,
    total: i64,
}

pub struct PayloadConverter {
    config: ConversionConfig,
}

impl PayloadConverter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn convert(
        &self,
        invoice: &Invoice,
        address: &ShippingAddress,
    ) -> Result<ConvertedShipment, ConversionError> {
        let shipping = address
            .shipping_request
            .as_ref()
            .ok_or(ConversionError::MissingField("shippingRequest"))?;
        let cart = invoice
            .cart_snapshot
            .as_ref()
            .ok_or(ConversionError::MissingField("cartSnapshot"))?;
        let amount = invoice
            .amount
            .ok_or(ConversionError::MissingField("amount"))?;

        let conversion = ConversionMetadata {
            original_amount: amount,
            original_currency: REFERENCE_CURRENCY.to_string(),
            converted_amount: self.to_destination(amount, "amount")?,
            destination_currency: DESTINATION_CURRENCY.to_string(),
            rate: self.config.currency_rate,
        };

        let financials = self.financials(cart, shipping, conversion.converted_amount)?;
        let items = self.items(cart)?;
        let destination = destination(shipping)?;
        let packaging = &self.config.packaging;
        let (gift_wrapping_unit, gift_wrapping_type) = if shipping.gift_wrapping {
            (
                Some(packaging.gift_wrapping_unit.clone()),
                Some(packaging.gift_wrapping_type.clone()),
            )
        } else {
            (None, None)
        };

        let request = ShipmentRequest {
            identifier: invoice.id.clone(),
            order_no: non_blank(&invoice.session_id)
                .unwrap_or(invoice.id.as_str())
                .to_string(),
            subtotal_amount: financials.subtotal,
            delivery_charge: financials.delivery,
            handling_charge: financials.handling,
            discount_amount: financials.discount,
            total_amount: financials.total,
            cushioning_unit: packaging.cushioning_unit.clone(),
            cushioning_type: packaging.cushioning_type.clone(),
            gift_wrapping_unit,
            gift_wrapping_type,
            items,
            sender: self.config.sender.clone(),
            destination,
        };

        Ok(ConvertedShipment {
            request,
            conversion,
        })
    }

    /// Converts a reference-currency amount into whole destination units.
    fn to_destination(&self, value: Decimal, field: &str) -> Result<i64, ConversionError> {
        let converted = value
            .checked_mul(self.config.currency_rate)
            .ok_or_else(|| out_of_range(field))?;
        round_units(converted, field)
    }

    fn financials(
        &self,
        cart: &CartSnapshot,
        shipping: &ShippingRequestRecord,
        converted_amount: i64,
    ) -> Result<Financials, ConversionError> {
        let delivery = match shipping.shipping_fee {
            Some(fee) if fee < Decimal::ZERO => {
                return Err(ConversionError::InvalidValue {
                    field: "shipping_fee".to_string(),
                    reason: format!("{fee} is negative"),
                });
            }
            Some(fee) => round_units(fee, "shipping_fee")?,
            None => 0,
        };
        let subtotal = match cart.subtotal {
            Some(subtotal) => self.to_destination(subtotal, "cartSnapshot.subtotal")?,
            None => converted_amount
                .checked_sub(delivery)
                .ok_or_else(|| out_of_range("cartSnapshot.subtotal"))?
                .max(0),
        };
        let discount = match cart.discount {
            Some(discount) => self.to_destination(discount, "cartSnapshot.discount")?,
            None => 0,
        };
        let handling = round_units(self.config.handling_fee, "handling_fee")?;
        let total = subtotal
            .checked_add(delivery)
            .and_then(|t| t.checked_add(handling))
            .and_then(|t| t.checked_sub(discount))
            .ok_or_else(|| out_of_range("total_amount"))?
            .max(0);

        Ok(Financials {
            subtotal,
            delivery,
            handling,
            discount,
            total,
        })
    }

    fn items(&self, cart: &CartSnapshot) -> Result<Vec<ShipmentItem>, ConversionError> {
        cart.items
            .iter()
            .enumerate()
            .map(|(i, item)| -> Result<ShipmentItem, ConversionError> {
                let id = non_blank(&item.id)
                    .ok_or(ConversionError::MissingField("cartSnapshot.items.id"))?;
                let quantity = item
                    .quantity
                    .filter(|q| q.fract().is_zero() && *q > Decimal::ZERO)
                    .and_then(|q| q.to_u32())
                    .ok_or_else(|| ConversionError::InvalidValue {
                        field: format!("cartSnapshot.items[{i}].quantity"),
                        reason: "must be a positive integer".to_string(),
                    })?;
                let code = self
                    .config
                    .product_codes
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| id.to_string());
                Ok(ShipmentItem { code, quantity })
            })
            .collect()
    }
}

fn out_of_range(field: &str) -> ConversionError {
    ConversionError::InvalidValue {
        field: field.to_string(),
        reason: "out of range".to_string(),
    }
}

/// Nearest integer, halves rounded away from zero.
fn round_units(value: Decimal, field: &str) -> Result<i64, ConversionError> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ConversionError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} is out of range"),
        })
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConversionError> {
    non_blank(value)
        .map(str::to_string)
        .ok_or(ConversionError::MissingField(field))
}

fn optional(value: &Option<String>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

fn destination(shipping: &ShippingRequestRecord) -> Result<ShipmentDestination, ConversionError> {
    let international = shipping
        .international
        .ok_or(ConversionError::MissingField("shippingRequest.international"))?;
    let recipient = shipping
        .recipient
        .as_ref()
        .ok_or(ConversionError::MissingField("shippingRequest.recipient"))?;

    if international {
        Ok(ShipmentDestination::International {
            recipient: international_recipient(recipient)?,
            delivery_service: optional(&shipping.delivery_service)
                .map(|s| s.parse())
                .transpose()?,
        })
    } else {
        Ok(ShipmentDestination::Domestic {
            recipient: domestic_recipient(recipient)?,
            delivery_carrier: optional(&shipping.delivery_carrier)
                .map(|s| s.parse())
                .transpose()?,
            delivery_method: optional(&shipping.delivery_method)
                .map(|s| s.parse())
                .transpose()?,
        })
    }
}

fn domestic_recipient(r: &RecipientRecord) -> Result<DomesticRecipient, ConversionError> {
    Ok(DomesticRecipient {
        name: required(&r.name, "recipient.name")?,
        postcode: required(&r.postcode, "recipient.postcode")?,
        prefecture: required(&r.prefecture, "recipient.prefecture")?,
        address1: required(&r.address1, "recipient.address1")?,
        address2: optional(&r.address2),
        phone: required(&r.phone, "recipient.phone")?,
    })
}

fn international_recipient(r: &RecipientRecord) -> Result<InternationalRecipient, ConversionError> {
    Ok(InternationalRecipient {
        name: required(&r.name, "recipient.name")?,
        region_code: required(&r.region_code, "recipient.region_code")?.to_ascii_uppercase(),
        state: optional(&r.state),
        city: required(&r.city, "recipient.city")?,
        address1: required(&r.address1, "recipient.address1")?,
        address2: optional(&r.address2),
        postcode: required(&r.postcode, "recipient.postcode")?,
        phone: required(&r.phone, "recipient.phone")?,
    })
}
