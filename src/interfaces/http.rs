//! HTTP surface: the payment webhook, the direct shipment trigger and a health check.
//!
//! Routes only accept the methods they declare; axum answers anything else with
//! 405 before a handler runs.

use crate::application::orchestrator::{
    FulfillmentOrchestrator, ShipOptions, ShipmentDisposition, ShipmentReport,
};
use crate::error::{BridgeError, ShipmentApiError, VerificationError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FulfillmentOrchestrator>,
    /// Attach `error.details` to every error response.
    pub debug: bool,
}

impl AppState {
    pub fn new(orchestrator: FulfillmentOrchestrator, debug: bool) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            debug,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/payment", post(payment_webhook))
        .route("/shipments", post(create_shipment))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(address = %listener.local_addr()?, "Fulfillment bridge listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}

/// Error body shared by every route:
/// `{success:false, error:{type, message, troubleshooting[], details?}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_type: &'static str,
    message: String,
    troubleshooting: Vec<String>,
    details: Option<Value>,
}

const JSON_BODY_HINT: &str = "Send a JSON object body";

impl ApiError {
    fn bad_request(message: impl Into<String>, hint: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: "InvalidRequestError",
            message: message.into(),
            troubleshooting: vec![hint.to_string()],
            details: None,
        }
    }

    fn from_bridge(e: BridgeError, debug: bool) -> Self {
        let details = debug.then(|| Value::String(format!("{e:?}")));
        let (status, message, troubleshooting) = match &e {
            BridgeError::Verification(VerificationError::MissingFields(_)) => (
                StatusCode::BAD_REQUEST,
                e.to_string(),
                vec!["Include order_reference, status and signature".to_string()],
            ),
            BridgeError::Verification(VerificationError::SignatureMismatch) => (
                StatusCode::UNAUTHORIZED,
                "Invalid signature".to_string(),
                vec!["Check that the webhook secret matches the payment processor".to_string()],
            ),
            BridgeError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string(), Vec::new()),
            BridgeError::Validation(report) => (
                StatusCode::BAD_REQUEST,
                "Invoice is not ready for shipment".to_string(),
                report.errors.clone(),
            ),
            BridgeError::Conversion(_) => (
                StatusCode::BAD_REQUEST,
                e.to_string(),
                vec!["Check the carrier, service and product codes on the order".to_string()],
            ),
            BridgeError::ShipmentInProgress(_) => (
                StatusCode::CONFLICT,
                e.to_string(),
                vec!["Retry once the current submission has finished".to_string()],
            ),
            BridgeError::Storage(_)
            | BridgeError::Config(_)
            | BridgeError::Io(_)
            | BridgeError::Json(_) => {
                error!(error = %e, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                    Vec::new(),
                )
            }
        };
        Self {
            status,
            error_type: e.error_type(),
            message,
            troubleshooting,
            details,
        }
    }

    /// Provider auth and validation failures keep their HTTP meaning; everything
    /// else is reported as an unsuccessful 200.
    fn from_provider(e: &ShipmentApiError, debug: bool) -> Self {
        let status = match e {
            ShipmentApiError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ShipmentApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::OK,
        };
        let message = match e {
            ShipmentApiError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let details = debug.then(|| match e {
            ShipmentApiError::Validation {
                status,
                field_errors,
                ..
            } => json!({ "status": status, "fieldErrors": field_errors }),
            other => Value::String(format!("{other:?}")),
        });
        Self {
            status,
            error_type: e.error_type(),
            message,
            troubleshooting: troubleshooting(e),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "type": self.error_type,
            "message": self.message,
            "troubleshooting": self.troubleshooting,
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (
            self.status,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response()
    }
}

fn troubleshooting(e: &ShipmentApiError) -> Vec<String> {
    let hints: &[&str] = match e {
        ShipmentApiError::Auth { .. } => &[
            "Check FULFILLMENT_API_TOKEN",
            "Confirm the token has not expired or been revoked",
        ],
        ShipmentApiError::Validation { .. } => &[
            "Check the recipient address and postcode",
            "Confirm every cart item maps to a registered product code",
        ],
        ShipmentApiError::Api { .. } => &["The provider returned an error; retry later"],
        ShipmentApiError::Network(_) => &[
            "Check FULFILLMENT_API_BASE_URL",
            "Check outbound network connectivity",
        ],
        ShipmentApiError::Timeout(_) => &[
            "The provider did not answer in time",
            "Check the provider for a created shipment before retrying",
        ],
        ShipmentApiError::Protocol(_) => &["The provider response format may have changed"],
    };
    hints.iter().map(|h| h.to_string()).collect()
}

fn parse_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request(
            "Request body must be a JSON object",
            JSON_BODY_HINT,
        )),
        Err(e) => Err(ApiError::bad_request(
            format!("Invalid JSON body: {e}"),
            JSON_BODY_HINT,
        )),
    }
}

fn elapsed_ms(started: Instant) -> String {
    format!("{}ms", started.elapsed().as_millis())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn payment_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let payload = parse_object(&body)?;

    let outcome = state
        .orchestrator
        .handle_webhook(&payload)
        .await
        .map_err(|e| ApiError::from_bridge(e, state.debug))?;

    let mut body = json!({
        "success": true,
        "invoiceId": outcome.invoice.id,
        "status": outcome.invoice.status.as_str(),
        "processedAction": outcome.action,
        "processingTime": elapsed_ms(started),
    });
    if let Some(shipment) = &outcome.shipment {
        body["shipment"] = match shipment {
            Ok(report) => shipment_summary(report),
            Err(message) => json!({ "status": "error", "message": message }),
        };
    }
    Ok(Json(body))
}

fn shipment_summary(report: &ShipmentReport) -> Value {
    match &report.disposition {
        ShipmentDisposition::Submitted(receipt) => {
            json!({ "status": "submitted", "shipmentId": receipt.id })
        }
        ShipmentDisposition::AlreadyShipped { shipment_id } => {
            json!({ "status": "already_shipped", "shipmentId": shipment_id })
        }
        ShipmentDisposition::Rejected(e) => json!({
            "status": "failed",
            "error": { "type": e.error_type(), "message": e.compact() },
        }),
        ShipmentDisposition::ValidatedOnly => json!({ "status": "validated" }),
    }
}

async fn create_shipment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let request = parse_object(&body)?;

    let invoice_id = match request.get("invoiceId").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            return Err(ApiError::bad_request(
                "invoiceId is required and must be a string",
                "Include invoiceId as a non-empty string, e.g. {\"invoiceId\": \"ORD-1\"}",
            ));
        }
    };
    let flag = |key: &str| request.get(key).and_then(Value::as_bool).unwrap_or(false);
    let options = ShipOptions {
        validate_only: flag("validateOnly"),
    };
    let debug = state.debug || flag("includeDebugInfo");

    let report = state
        .orchestrator
        .ship_invoice(&invoice_id, options)
        .await
        .map_err(|e| ApiError::from_bridge(e, debug))?;

    let mut details = json!({
        "invoiceId": report.invoice_id,
        "processingTime": elapsed_ms(started),
    });
    if let Some(request) = &report.request {
        details["identifier"] = json!(request.identifier);
        details["international"] = json!(request.destination.is_international());
        details["itemCount"] = json!(request.items.len());
        details["totalAmount"] = json!(request.total_amount);
        if debug || options.validate_only {
            details["payload"] = json!(request);
        }
    }
    if let Some(validation) = &report.validation {
        details["validation"] = json!(validation);
    }

    let shipment_response = match &report.disposition {
        ShipmentDisposition::Submitted(receipt) => json!(receipt),
        ShipmentDisposition::AlreadyShipped { shipment_id } => {
            json!({ "id": shipment_id, "alreadyShipped": true })
        }
        ShipmentDisposition::ValidatedOnly => {
            details["validateOnly"] = json!(true);
            Value::Null
        }
        ShipmentDisposition::Rejected(e) => return Err(ApiError::from_provider(e, debug)),
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "shipmentResponse": shipment_response,
            "conversionMetadata": report.conversion,
            "requestDetails": details,
        }
    })))
}
