//! HTTP API tests
//!
//! Exercises the router end to end over the in-memory store.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::{Entity, EntitySource, Transaction, TransactionSource};
use spice_erp_backend::config::{
    Config, DatabaseConfig, ReconciliationConfig, ServerConfig, StorageBackend, StorageConfig,
};
use spice_erp_backend::store::MemoryStore;
use spice_erp_backend::{create_app, AppState};
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 0,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        reconciliation: ReconciliationConfig::default(),
    }
}

fn app(store: &Arc<MemoryStore>) -> Router {
    create_app(AppState {
        store: store.clone(),
        config: Arc::new(test_config()),
    })
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn as_dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => dec(s),
        other => dec(&other.to_string()),
    }
}

async fn seeded_store() -> (Arc<MemoryStore>, Entity) {
    let store = Arc::new(MemoryStore::new());
    let pepper = Entity {
        id: Uuid::new_v4(),
        source: EntitySource::RawMaterial,
        name: "Black Pepper".to_string(),
        category: "Whole Spices".to_string(),
        unit: "kg".to_string(),
        minimum_threshold: dec("10"),
        current_stock: dec("20"),
    };
    store.insert_entity(pepper.clone()).await;
    (store, pepper)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_store_connected() {
    let (store, _) = seeded_store().await;
    let (status, body) = send(app(&store), "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}

// ============================================================================
// Reconcile
// ============================================================================

#[tokio::test]
async fn test_reconcile_returns_snapshot_rows() {
    let (store, pepper) = seeded_store().await;
    store
        .record_transaction(Transaction {
            id: Uuid::new_v4(),
            source: TransactionSource::StockPurchase,
            entity_id: pepper.id,
            occurred_on: chrono::NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            completed_on: None,
            quantity: dec("5.5"),
            wastage: None,
            process: None,
            channel_id: None,
        })
        .await;

    let (status, body) = send(
        app(&store),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-01-15" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ledger"], "stock");
    assert_eq!(body["period"], json!({ "month": "Jan", "year": 2024 }));
    assert_eq!(body["summary"]["normal"], 1);

    let row = &body["rows"][0];
    assert_eq!(row["outcome"], "ok");
    assert_eq!(row["entity"]["name"], "Black Pepper");
    assert_eq!(as_dec(&row["snapshot"]["opening_balance"]), dec("20"));
    assert_eq!(as_dec(&row["snapshot"]["closing_balance"]), dec("25.5"));
    assert_eq!(row["snapshot"]["status"], "normal");
}

#[tokio::test]
async fn test_unknown_ledger_is_not_found() {
    let (store, _) = seeded_store().await;
    let (status, body) = send(
        app(&store),
        "POST",
        "/api/v1/status/spices/reconcile",
        Some(json!({ "status_date": "2024-01-15" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_entity_filter_is_rejected() {
    let (store, _) = seeded_store().await;
    let (status, body) = send(
        app(&store),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-01-15", "entity_ids": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_failed_rows_are_reported_with_ok_status() {
    let (store, pepper) = seeded_store().await;
    store.fail_reads_for(pepper.id).await;

    let (status, body) = send(
        app(&store),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-02-01" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["rows"][0]["outcome"], "failed");
    assert_eq!(body["rows"][0]["error"]["retryable"], true);
}

// ============================================================================
// Adjustments
// ============================================================================

#[tokio::test]
async fn test_adjustments_accept_lenient_values() {
    let (store, pepper) = seeded_store().await;
    let router = app(&store);

    let (_, body) = send(
        router.clone(),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-03-01" })),
    )
    .await;
    let snapshot_id = body["rows"][0]["snapshot_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router.clone(),
        "POST",
        "/api/v1/status/stock/adjustments",
        Some(json!({ "adjustments": { snapshot_id.clone(): "-4.25" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_dec(&body["rows"][0]["snapshot"]["closing_balance"]), dec("15.75"));

    // Non-numeric input counts as zero
    let (status, body) = send(
        router,
        "POST",
        "/api/v1/status/stock/adjustments",
        Some(json!({ "adjustments": { snapshot_id: "n/a" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_dec(&body["rows"][0]["snapshot"]["adjustment"]), Decimal::ZERO);
    assert_eq!(as_dec(&body["rows"][0]["snapshot"]["closing_balance"]), dec("20"));

    let master = store.entity(EntitySource::RawMaterial, pepper.id).await.unwrap();
    assert_eq!(master.current_stock, dec("20"));
}

#[tokio::test]
async fn test_out_of_range_adjustment_is_a_failed_row() {
    let (store, pepper) = seeded_store().await;
    let router = app(&store);

    let (_, body) = send(
        router.clone(),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-05-01" })),
    )
    .await;
    let snapshot_id = body["rows"][0]["snapshot_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        router,
        "POST",
        "/api/v1/status/stock/adjustments",
        Some(json!({ "adjustments": { snapshot_id: "79228162514264337593543950335" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["rows"][0]["outcome"], "failed");
    assert_eq!(body["rows"][0]["error"]["code"], "VALIDATION_ERROR");

    let master = store.entity(EntitySource::RawMaterial, pepper.id).await.unwrap();
    assert_eq!(master.current_stock, dec("20"));
}

#[tokio::test]
async fn test_empty_adjustments_are_rejected() {
    let (store, _) = seeded_store().await;
    let (status, _) = send(
        app(&store),
        "POST",
        "/api/v1/status/inventory/adjustments",
        Some(json!({ "adjustments": {} })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_period_listing_and_history() {
    let (store, pepper) = seeded_store().await;
    let router = app(&store);

    let (status, body) = send(router.clone(), "GET", "/api/v1/status/stock/periods/Apr-2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([]));

    send(
        router.clone(),
        "POST",
        "/api/v1/status/stock/reconcile",
        Some(json!({ "status_date": "2024-04-30" })),
    )
    .await;

    let (_, body) = send(router.clone(), "GET", "/api/v1/status/stock/periods/Apr-2024", None).await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/status/stock/entities/{}/history", pepper.id);
    let (status, body) = send(router.clone(), "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["period"]["month"], "Apr");

    let (status, body) = send(router, "GET", "/api/v1/status/stock/periods/April-24", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "period");
}
