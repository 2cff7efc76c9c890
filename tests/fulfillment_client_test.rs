mod common;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{domestic_address, pending_invoice};
use fulfillment_bridge::application::converter::PayloadConverter;
use fulfillment_bridge::config::{ConversionConfig, FulfillmentApiConfig};
use fulfillment_bridge::domain::ports::FulfillmentApi;
use fulfillment_bridge::domain::shipment::ShipmentRequest;
use fulfillment_bridge::error::ShipmentApiError;
use fulfillment_bridge::infrastructure::fulfillment_client::FulfillmentClient;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Serves `app` on a random local port and returns its base URL.
async fn start_mock(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock provider");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock provider failed");
    });
    format!("http://{addr}/api")
}

fn client(base_url: &str, timeout: Duration) -> FulfillmentClient {
    FulfillmentClient::new(FulfillmentApiConfig {
        base_url: base_url.to_string(),
        token: "tok_test".to_string(),
        api_version: "1.5".to_string(),
        timeout,
    })
    .unwrap()
}

fn request() -> ShipmentRequest {
    PayloadConverter::new(ConversionConfig::default())
        .convert(&pending_invoice("ORD-1"), &domestic_address())
        .unwrap()
        .request
}

#[tokio::test]
async fn test_successful_submission_sends_auth_and_version() {
    let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::new(Mutex::new(None));
    let captured = seen.clone();
    let app = Router::new().route(
        "/api/shipments",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                let identifier = body["identifier"].clone();
                *captured.lock().await = Some((headers, body));
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "id": 88123,
                        "identifier": identifier,
                        "order_no": "cs_ORD-1",
                        "status": "WAITING"
                    })),
                )
            }
        }),
    );
    let url = start_mock(app).await;

    let receipt = client(&url, Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap();

    assert_eq!(receipt.id, "88123");
    assert_eq!(receipt.identifier, "ORD-1");
    assert_eq!(receipt.status, "WAITING");

    let (headers, body) = seen.lock().await.take().unwrap();
    assert_eq!(headers["authorization"], "Bearer tok_test");
    assert_eq!(headers["x-api-version"], "1.5");
    assert_eq!(body["international"], json!(false));
    assert_eq!(body["total_amount"], json!(45));
    assert_eq!(body["items"][0], json!({ "code": "P1", "quantity": 2 }));
}

#[tokio::test]
async fn test_postcode_rejection_is_simplified() {
    let app = Router::new().route(
        "/api/shipments",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "The given data was invalid.",
                    "errors": { "recipient.postcode": ["postcode does not match address"] }
                })),
            )
        }),
    );
    let url = start_mock(app).await;

    let err = client(&url, Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap_err();

    match err {
        ShipmentApiError::Validation {
            status,
            message,
            field_errors,
        } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Address and postcode mismatch");
            assert!(field_errors.contains_key("recipient.postcode"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let app = Router::new().route(
        "/api/shipments",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Unauthenticated." })),
            )
        }),
    );
    let url = start_mock(app).await;

    let err = client(&url, Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "AuthError");
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let app = Router::new().route(
        "/api/shipments",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "maintenance") }),
    );
    let url = start_mock(app).await;

    let err = client(&url, Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ShipmentApiError::Api {
            status: 500,
            message: "maintenance".into()
        }
    );
}

#[tokio::test]
async fn test_success_without_receipt_fields_is_protocol_error() {
    let app = Router::new().route(
        "/api/shipments",
        post(|| async { (StatusCode::OK, Json(json!({ "ok": true }))) }),
    );
    let url = start_mock(app).await;

    let err = client(&url, Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "ProtocolError");
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let app = Router::new().route(
        "/api/shipments",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let url = start_mock(app).await;

    let err = client(&url, Duration::from_millis(200))
        .submit(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, ShipmentApiError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/api"), Duration::from_secs(5))
        .submit(&request())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "NetworkError");
}

#[test]
fn test_empty_base_url_is_rejected() {
    let result = FulfillmentClient::new(FulfillmentApiConfig {
        base_url: String::new(),
        ..FulfillmentApiConfig::default()
    });
    assert!(result.is_err());
}
