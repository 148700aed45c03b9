//! End-to-end tests for the API over the in-process bus.
//!
//! All three services run in one process wired to the same [`InMemoryBus`],
//! so these tests exercise the real saga: RPC availability check,
//! reservation consumer, fulfillment intake, and status propagation.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use common::ProductId;
use inventory::{InMemoryStockStore, StockRecord, StockStore};
use messaging::{InMemoryBus, MessageBus};
use metrics_exporter_prometheus::PrometheusHandle;
use sales::InMemoryOrderStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (Router, InMemoryStockStore, InMemoryOrderStore) {
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let (state, stock, orders) = api::create_default_state(bus).await.unwrap();
    let app = api::create_app(state, get_metrics_handle());
    (app, stock, orders)
}

async fn seed_stock(stock: &InMemoryStockStore, sku: &str, quantity: u32) {
    stock.put(StockRecord::new(sku, quantity)).await.unwrap();
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, bytes)
}

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

fn order_body(sku: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "shipping_address": "1 Main St",
        "items": [{
            "product_id": sku,
            "quantity": quantity,
            "unit_price_cents": 1000
        }]
    })
}

/// Polls `check` until it returns true or the deadline passes.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;
    let (status, _, body) = send(&app, "GET", "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;
    let (status, _, _) = send(&app, "GET", "/metrics", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_order_reserves_stock_and_creates_delivery() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 10).await;

    let (status, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 2)), &[]).await;
    assert_eq!(status, StatusCode::CREATED);

    let created = json(&body);
    assert_eq!(created["status"], "PendingShipment");
    assert_eq!(created["total_cents"], 2000);
    let order_id = created["order_id"].as_str().unwrap().to_string();

    // Reservation lands asynchronously.
    eventually("stock reservation", || {
        let stock = stock.clone();
        async move {
            stock
                .get(&ProductId::new("SKU-001"))
                .await
                .unwrap()
                .unwrap()
                .quantity
                == 8
        }
    })
    .await;

    // And the fulfillment announcement produces a pending delivery.
    let app2 = app.clone();
    eventually("delivery creation", move || {
        let app = app2.clone();
        let order_id = order_id.clone();
        async move {
            let (_, _, body) = send(&app, "GET", "/deliveries", None, &[]).await;
            let deliveries = json(&body);
            deliveries
                .as_array()
                .unwrap()
                .iter()
                .any(|d| d["order_id"] == order_id.as_str() && d["status"] == "PENDING")
        }
    })
    .await;
}

#[tokio::test]
async fn test_get_order_returns_lines() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 10).await;

    let (_, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 3)), &[]).await;
    let order_id = json(&body)["order_id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, "GET", &format!("/orders/{order_id}"), None, &[]).await;
    assert_eq!(status, StatusCode::OK);

    let order = json(&body);
    assert_eq!(order["id"], order_id.as_str());
    assert_eq!(order["status"], "PendingShipment");
    assert_eq!(order["items"][0]["product_id"], "SKU-001");
    assert_eq!(order["items"][0]["line_total_cents"], 3000);
}

#[tokio::test]
async fn test_unavailable_item_rejects_order_without_side_effects() {
    let (app, stock, orders) = setup().await;
    seed_stock(&stock, "SKU-001", 1).await;

    let (status, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 5)), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error = json(&body);
    let unavailable = error["unavailableItems"].as_array().unwrap();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0]["productId"], "SKU-001");
    assert_eq!(unavailable[0]["reason"], "insufficient stock");

    assert_eq!(orders.order_count().await, 0);
    assert_eq!(stock.movement_count().await, 0);
}

#[tokio::test]
async fn test_idempotency_key_replays_response() {
    let (app, stock, orders) = setup().await;
    seed_stock(&stock, "SKU-001", 100).await;

    let headers = [("idempotency-key", "retry-abc-123")];
    let (status1, headers1, body1) = send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &headers,
    )
    .await;
    assert_eq!(status1, StatusCode::CREATED);
    assert!(!headers1.contains_key("idempotency-replayed"));

    let (status2, headers2, body2) = send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &headers,
    )
    .await;
    assert_eq!(status2, StatusCode::CREATED);
    assert_eq!(headers2.get("idempotency-replayed").unwrap(), "true");

    // Byte-identical replay, and no second order row.
    assert_eq!(body1, body2);
    assert_eq!(orders.order_count().await, 1);
}

#[tokio::test]
async fn test_different_keys_execute_independently() {
    let (app, stock, orders) = setup().await;
    seed_stock(&stock, "SKU-001", 100).await;

    send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &[("idempotency-key", "key-one")],
    )
    .await;
    send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &[("idempotency-key", "key-two")],
    )
    .await;

    assert_eq!(orders.order_count().await, 2);
}

#[tokio::test]
async fn test_invalid_idempotency_key_rejected() {
    let (app, stock, orders) = setup().await;
    seed_stock(&stock, "SKU-001", 100).await;

    let long_key = "k".repeat(300);
    let (status, _, _) = send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &[("idempotency-key", long_key.as_str())],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(orders.order_count().await, 0);

    let (status, _, _) = send(
        &app,
        "POST",
        "/orders",
        Some(order_body("SKU-001", 1)),
        &[("idempotency-key", "   ")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_availability_endpoint() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 5).await;

    let body = serde_json::json!({
        "items": [
            {"productId": "SKU-001", "quantity": 3},
            {"productId": "SKU-404", "quantity": 1}
        ]
    });
    let (status, _, body) = send(&app, "POST", "/check-availability", Some(body), &[]).await;
    assert_eq!(status, StatusCode::OK);

    let report = json(&body);
    assert_eq!(report["available"], false);
    assert_eq!(report["items"][0]["available"], true);
    assert_eq!(report["items"][0]["currentStock"], 5);
    assert_eq!(report["items"][1]["reason"], "not found");
}

#[tokio::test]
async fn test_delivery_status_propagates_to_order() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 10).await;

    let (_, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 1)), &[]).await;
    let order_id = json(&body)["order_id"].as_str().unwrap().to_string();

    // Wait for the delivery to exist.
    let mut delivery_id = String::new();
    for _ in 0..100 {
        let (_, _, body) = send(&app, "GET", "/deliveries", None, &[]).await;
        if let Some(delivery) = json(&body)
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["order_id"] == order_id.as_str())
        {
            delivery_id = delivery["id"].as_str().unwrap().to_string();
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!delivery_id.is_empty(), "delivery never created");

    let (status, _, body) = send(
        &app,
        "PATCH",
        &format!("/deliveries/{delivery_id}/status"),
        Some(serde_json::json!({"status": "IN_TRANSIT"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "IN_TRANSIT");

    // The propagation message flips the order to Shipped.
    let app2 = app.clone();
    let order_uri = format!("/orders/{order_id}");
    eventually("order status propagation", move || {
        let app = app2.clone();
        let uri = order_uri.clone();
        async move {
            let (_, _, body) = send(&app, "GET", &uri, None, &[]).await;
            json(&body)["status"] == "Shipped"
        }
    })
    .await;
}

#[tokio::test]
async fn test_invalid_delivery_status_value_rejected() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 10).await;

    let (_, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 1)), &[]).await;
    let order_id = json(&body)["order_id"].as_str().unwrap().to_string();

    let mut delivery_id = String::new();
    for _ in 0..100 {
        let (_, _, body) = send(&app, "GET", "/deliveries", None, &[]).await;
        if let Some(delivery) = json(&body)
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["order_id"] == order_id.as_str())
        {
            delivery_id = delivery["id"].as_str().unwrap().to_string();
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!delivery_id.is_empty(), "delivery never created");

    // Unknown enum value: rejected before any mutation.
    let (status, _, _) = send(
        &app,
        "PATCH",
        &format!("/deliveries/{delivery_id}/status"),
        Some(serde_json::json!({"status": "TELEPORTED"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Invalid transition: PENDING cannot jump straight to DELIVERED.
    let (status, _, _) = send(
        &app,
        "PATCH",
        &format!("/deliveries/{delivery_id}/status"),
        Some(serde_json::json!({"status": "DELIVERED"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, body) = send(&app, "GET", &format!("/deliveries/{delivery_id}"), None, &[]).await;
    assert_eq!(json(&body)["status"], "PENDING");
}

#[tokio::test]
async fn test_order_status_patch_validates_transition() {
    let (app, stock, _) = setup().await;
    seed_stock(&stock, "SKU-001", 10).await;

    let (_, _, body) = send(&app, "POST", "/orders", Some(order_body("SKU-001", 1)), &[]).await;
    let order_id = json(&body)["order_id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(serde_json::json!({"status": "Shipped"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "Shipped");

    // Cancelled is only reachable from PendingShipment.
    let (status, _, _) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(serde_json::json!({"status": "Cancelled"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(serde_json::json!({"status": "Sideways"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_resources_return_404() {
    let (app, _, _) = setup().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _, _) = send(&app, "GET", &format!("/orders/{missing}"), None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, "GET", &format!("/deliveries/{missing}"), None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, "GET", "/orders/not-a-uuid", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
