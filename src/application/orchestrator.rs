use super::converter::{ConvertedShipment, PayloadConverter};
use super::state::{OrderStateManager, ProcessedAction, ShipmentClaim};
use super::validator::{ValidationReport, validate};
use super::verifier::WebhookVerifier;
use crate::domain::invoice::Invoice;
use crate::domain::ports::FulfillmentApiBox;
use crate::domain::shipment::{ConversionMetadata, ShipmentReceipt, ShipmentRequest};
use crate::error::{BridgeError, Result, ShipmentApiError};
use serde_json::{Map, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipOptions {
    /// Stop after validation and conversion; nothing is submitted.
    pub validate_only: bool,
}

/// How a shipment request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentDisposition {
    Submitted(ShipmentReceipt),
    /// The provider refused or could not be reached. Captured as data so the
    /// invoice can be marked failed.
    Rejected(ShipmentApiError),
    AlreadyShipped { shipment_id: String },
    ValidatedOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentReport {
    pub invoice_id: String,
    pub disposition: ShipmentDisposition,
    pub validation: Option<ValidationReport>,
    pub conversion: Option<ConversionMetadata>,
    /// The request that was (or would have been) submitted.
    pub request: Option<ShipmentRequest>,
}

impl ShipmentReport {
    fn already_shipped(invoice_id: &str, shipment_id: String) -> Self {
        Self {
            invoice_id: invoice_id.to_string(),
            disposition: ShipmentDisposition::AlreadyShipped { shipment_id },
            validation: None,
            conversion: None,
            request: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    pub invoice: Invoice,
    pub action: ProcessedAction,
    /// Present when the payment triggered a shipment attempt.
    pub shipment: Option<std::result::Result<ShipmentReport, String>>,
}

/// Drives verify, transition, validate, convert, submit and record.
pub struct FulfillmentOrchestrator {
    verifier: WebhookVerifier,
    state: OrderStateManager,
    converter: PayloadConverter,
    api: FulfillmentApiBox,
    auto_ship: bool,
}

impl FulfillmentOrchestrator {
    pub fn new(
        verifier: WebhookVerifier,
        state: OrderStateManager,
        converter: PayloadConverter,
        api: FulfillmentApiBox,
        auto_ship: bool,
    ) -> Self {
        Self {
            verifier,
            state,
            converter,
            api,
            auto_ship,
        }
    }

    pub fn state(&self) -> &OrderStateManager {
        &self.state
    }

    /// Handles one payment webhook delivery.
    ///
    /// The payment transition is committed before any shipment work starts, and a
    /// shipment failure is reported in the outcome rather than returned as an error.
    pub async fn handle_webhook(&self, payload: &Map<String, Value>) -> Result<WebhookOutcome> {
        let event = self.verifier.verify(payload).await?;
        let transition = self.state.apply_event(&event).await?;

        let shipment = if transition.action == ProcessedAction::MarkedPaid && self.auto_ship {
            match self.ship_invoice(&transition.invoice.id, ShipOptions::default()).await {
                Ok(report) => Some(Ok(report)),
                Err(e) => {
                    warn!(
                        invoice_id = %transition.invoice.id,
                        error = %e,
                        "Automatic shipment failed; payment status is unaffected"
                    );
                    Some(Err(e.to_string()))
                }
            }
        } else {
            None
        };

        Ok(WebhookOutcome {
            invoice: transition.invoice,
            action: transition.action,
            shipment,
        })
    }

    /// Validates, converts and (unless `validate_only`) submits a shipment.
    pub async fn ship_invoice(
        &self,
        invoice_id: &str,
        options: ShipOptions,
    ) -> Result<ShipmentReport> {
        let invoice = self.state.load_invoice(invoice_id).await?;
        if let Some(shipment_id) = invoice.shipment_id.clone() {
            info!(invoice_id, shipment_id = %shipment_id, "Invoice already shipped; skipping");
            return Ok(ShipmentReport::already_shipped(invoice_id, shipment_id));
        }

        let (validation, converted) = self.prepare(&invoice).await?;
        let ConvertedShipment {
            request,
            conversion,
        } = converted;

        if options.validate_only {
            return Ok(ShipmentReport {
                invoice_id: invoice_id.to_string(),
                disposition: ShipmentDisposition::ValidatedOnly,
                validation: Some(validation),
                conversion: Some(conversion),
                request: Some(request),
            });
        }

        match self.state.claim_shipment(invoice_id).await? {
            ShipmentClaim::Claimed(_) => {}
            ShipmentClaim::AlreadyShipped { shipment_id } => {
                return Ok(ShipmentReport::already_shipped(invoice_id, shipment_id));
            }
            ShipmentClaim::InProgress => {
                return Err(BridgeError::ShipmentInProgress(invoice_id.to_string()));
            }
        }

        let disposition = match self.api.submit(&request).await {
            Ok(receipt) => {
                self.state.record_shipment_success(invoice_id, &receipt).await;
                ShipmentDisposition::Submitted(receipt)
            }
            Err(e) => {
                warn!(
                    invoice_id,
                    error_type = e.error_type(),
                    error = %e,
                    "Shipment submission failed"
                );
                self.state.record_shipment_failure(invoice_id, &e).await;
                ShipmentDisposition::Rejected(e)
            }
        };

        Ok(ShipmentReport {
            invoice_id: invoice_id.to_string(),
            disposition,
            validation: Some(validation),
            conversion: Some(conversion),
            request: Some(request),
        })
    }

    /// Resolves, validates and converts without touching the provider or the
    /// invoice. Used by `ship_invoice` and the CLI preview.
    pub async fn prepare(
        &self,
        invoice: &Invoice,
    ) -> Result<(ValidationReport, ConvertedShipment)> {
        let address = self.state.resolve_address(invoice).await?;
        let validation = validate(invoice, &address);
        for warning in &validation.warnings {
            warn!(invoice_id = %invoice.id, warning = %warning, "Shipment validation warning");
        }
        if !validation.is_valid {
            return Err(BridgeError::Validation(validation));
        }
        let converted = self.converter.convert(invoice, &address)?;
        Ok((validation, converted))
    }
}
