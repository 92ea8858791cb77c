//! HTTP surface tests, driving the router directly without a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use ledger_fraud_detect::config::Thresholds;
use ledger_fraud_detect::web;

const CYCLE_CSV: &str = "\
transaction_id,sender_id,receiver_id,amount,timestamp
T1,A,B,500,2026-01-01 10:00:00
T2,B,C,490,2026-01-01 11:00:00
T3,C,A,480,2026-01-01 12:00:00
";

fn app() -> Router {
    web::router(Thresholds::default(), "static")
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri).body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_analyze_auto_mapped_csv() {
    let (status, body) = send(post("/api/analyze", CYCLE_CSV)).await;

    assert_eq!(status, StatusCode::OK);
    let ring = &body["report"]["fraud_rings"][0];
    assert_eq!(ring["ring_id"], "RING_001");
    assert_eq!(ring["pattern_type"], "cycle");
    assert_eq!(ring["risk_score"], 91.0);
    assert_eq!(body["report"]["summary"]["total_accounts_analyzed"], 3);
    assert_eq!(body["edges"].as_array().unwrap().len(), 3);
    assert_eq!(body["edges"][0]["isRingEdge"], true);
}

#[tokio::test]
async fn test_analyze_with_query_mapping() {
    let csv = "payer_ref,payee_ref,sum_paid\nA,B,10\nB,C,10\nC,A,10\n";
    let (status, body) = send(post(
        "/api/analyze?sender_id=payer_ref&receiver_id=payee_ref&amount=sum_paid",
        csv,
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["fraud_rings"][0]["member_accounts"], serde_json::json!(["A", "B", "C"]));
}

#[tokio::test]
async fn test_unmappable_upload_needs_mapping() {
    let (status, body) = send(post("/api/analyze", "qqq,zzz,www\n1,2,3\n")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "NEEDS_MAPPING");
    assert_eq!(body["headers"], serde_json::json!(["qqq", "zzz", "www"]));
}

#[tokio::test]
async fn test_partial_query_mapping_is_rejected() {
    let (status, body) = send(post("/api/analyze?sender_id=a", CYCLE_CSV)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sender_id"));
}

#[tokio::test]
async fn test_upload_without_valid_rows() {
    let (status, body) = send(post("/api/analyze", "sender,receiver,amount\nA,A,5\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid transactions found in the CSV file.");
}

#[tokio::test]
async fn test_mapping_to_missing_column() {
    let (status, body) = send(post(
        "/api/analyze?sender_id=sender_id&receiver_id=receiver_id&amount=value",
        CYCLE_CSV,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'value'"));
}

#[tokio::test]
async fn test_preview() {
    let (status, body) = send(post("/api/preview", CYCLE_CSV)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["needs_mapping"], false);
    assert_eq!(body["row_count"], 3);
    assert_eq!(body["auto_mapping"]["sender_id"], "sender_id");
    assert_eq!(body["sample_rows"][0][0], "T1");
}

#[tokio::test]
async fn test_self_check_endpoint() {
    let (status, body) = send(Request::get("/api/test-detection").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success", "failures: {}", body["failures"]);
    assert!(body["failures"].as_array().unwrap().is_empty());
    assert!(body["summary"]["fraud_rings_detected"].as_u64().unwrap() >= 4);
}
