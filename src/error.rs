use crate::application::validator::ValidationReport;
use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Webhook verification failed: {0}")]
    Verification(#[from] VerificationError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {}", .0.errors.join("; "))]
    Validation(ValidationReport),
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("Shipment already in progress for invoice {0}")]
    ShipmentInProgress(String),
    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Stable discriminator surfaced to HTTP callers as `error.type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Verification(_) => "VerificationError",
            BridgeError::NotFound(_) => "NotFoundError",
            BridgeError::Validation(_) => "ValidationError",
            BridgeError::Conversion(_) => "ConversionError",
            BridgeError::ShipmentInProgress(_) => "ConflictError",
            BridgeError::Storage(_) | BridgeError::Io(_) | BridgeError::Json(_) => {
                "InternalError"
            }
            BridgeError::Config(_) => "ConfigurationError",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BridgeError {
    fn from(e: rocksdb::Error) -> Self {
        BridgeError::Storage(Box::new(e))
    }
}

/// Why an inbound payment event was rejected before touching any state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("signature mismatch")]
    SignatureMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("unsupported {kind} '{value}'")]
    Unsupported { kind: &'static str, value: String },
}

/// Outcome of a failed call to the fulfillment provider.
///
/// These are captured as data rather than propagated so the caller can record a
/// failed shipment against the invoice.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShipmentApiError {
    #[error("provider rejected credentials (HTTP {status}): {message}")]
    Auth { status: u16, message: String },
    #[error("provider rejected payload (HTTP {status}): {message}")]
    Validation {
        status: u16,
        message: String,
        field_errors: BTreeMap<String, serde_json::Value>,
    },
    #[error("provider error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("unexpected provider response: {0}")]
    Protocol(String),
}

impl ShipmentApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ShipmentApiError::Auth { .. } => "AuthError",
            ShipmentApiError::Validation { .. } => "ValidationError",
            ShipmentApiError::Api { .. } => "ApiError",
            ShipmentApiError::Network(_) => "NetworkError",
            ShipmentApiError::Timeout(_) => "TimeoutError",
            ShipmentApiError::Protocol(_) => "ProtocolError",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ShipmentApiError::Auth { status, .. }
            | ShipmentApiError::Validation { status, .. }
            | ShipmentApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short string persisted on the invoice after a failed submission.
    pub fn compact(&self) -> String {
        let text = match self {
            ShipmentApiError::Validation { message, .. } => {
                format!("{}: {}", self.error_type(), message)
            }
            other => format!("{}: {}", other.error_type(), other),
        };
        text.chars().take(200).collect()
    }
}
