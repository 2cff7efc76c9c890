use crate::domain::address::{ShippingAddress, non_blank};
use crate::domain::invoice::Invoice;
use rust_decimal::Decimal;
use serde::Serialize;

/// Every defect found in an invoice/address pair. Blocking problems go to
/// `errors`; `warnings` never affect `is_valid`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Checks an invoice and its resolved address against the provider's
/// mandatory-field contract. All checks run so one call reports every defect.
pub fn validate(invoice: &Invoice, address: &ShippingAddress) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_invoice(invoice, &mut report);
    check_cart(invoice, &mut report);
    check_address(address, &mut report);
    report.is_valid = report.errors.is_empty();
    report
}

fn check_invoice(invoice: &Invoice, report: &mut ValidationReport) {
    if invoice.id.trim().is_empty() {
        report.error("Missing required field: id");
    }
    if non_blank(&invoice.session_id).is_none() {
        report.error("Missing required field: sessionId");
    }
    match invoice.amount {
        None => report.error("Missing required field: amount"),
        Some(amount) if amount <= Decimal::ZERO => {
            report.error(format!("Invalid amount: {amount} (must be positive)"))
        }
        Some(_) => {}
    }
}

fn check_cart(invoice: &Invoice, report: &mut ValidationReport) {
    let Some(cart) = &invoice.cart_snapshot else {
        report.error("Missing required field: cartSnapshot.items");
        report.warning("Missing cartSnapshot.subtotal");
        return;
    };

    if cart.items.is_empty() {
        report.error("Missing required field: cartSnapshot.items (cart is empty)");
    }
    for (i, item) in cart.items.iter().enumerate() {
        if non_blank(&item.id).is_none() {
            report.error(format!("Missing required field: cartSnapshot.items[{i}].id"));
        }
        match item.quantity {
            None => report.error(format!(
                "Missing required field: cartSnapshot.items[{i}].quantity"
            )),
            Some(q) if q <= Decimal::ZERO => report.error(format!(
                "Invalid cartSnapshot.items[{i}].quantity: {q} (must be positive)"
            )),
            Some(_) => {}
        }
    }
    if cart.subtotal.is_none() {
        report.warning("Missing cartSnapshot.subtotal");
    }
}

fn check_address(address: &ShippingAddress, report: &mut ValidationReport) {
    let Some(request) = &address.shipping_request else {
        report.error("Missing required field: shippingRequest");
        return;
    };

    let international = request.international;
    if international.is_none() {
        report.error("Missing required field: shippingRequest.international (must be a boolean)");
    }
    match request.shipping_fee {
        None => report.warning("Missing shippingRequest.shipping_fee"),
        Some(fee) if fee < Decimal::ZERO => report.error(format!(
            "Invalid shippingRequest.shipping_fee: {fee} (must not be negative)"
        )),
        Some(_) => {}
    }

    let Some(recipient) = &request.recipient else {
        report.error("Missing required field: shippingRequest.recipient");
        return;
    };

    let mut require = |field: &str, value: &Option<String>| {
        if non_blank(value).is_none() {
            report.error(format!("Missing required field: recipient.{field}"));
        }
    };
    require("name", &recipient.name);
    require("address1", &recipient.address1);
    require("postcode", &recipient.postcode);
    require("phone", &recipient.phone);
    match international {
        Some(true) => {
            require("region_code", &recipient.region_code);
            require("city", &recipient.city);
        }
        Some(false) => require("prefecture", &recipient.prefecture),
        None => {}
    }
}
