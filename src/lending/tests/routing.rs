use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use super::common::{build_service, submission, today};
use crate::lending::domain::LoanStatus;
use crate::lending::router::lending_router;

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn submit_endpoint_returns_created_with_priced_terms() {
    let (service, _, _, _) = build_service();
    let router = lending_router(service);

    let payload = serde_json::to_value(submission()).expect("serializes");
    let response = router
        .oneshot(json_request("POST", "/api/v1/loans", payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "Applied");
    assert_eq!(body["term_months"], 6);
    assert_eq!(body["installment_amount"], 4125.0);
}

#[tokio::test]
async fn transition_endpoint_maps_role_failures_to_forbidden() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");
    let router = lending_router(service);

    let payload = json!({ "role": "manager", "type": "dismiss" });
    let uri = format!("/api/v1/loans/{}/transitions", record.application_id.0);
    let response = router
        .oneshot(json_request("POST", &uri, payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("Loan Officer"));
}

#[tokio::test]
async fn transition_endpoint_maps_wrong_status_to_conflict() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");
    let router = lending_router(service);

    let payload = json!({ "role": "manager", "type": "approve" });
    let uri = format!("/api/v1/loans/{}/transitions", record.application_id.0);
    let response = router
        .oneshot(json_request("POST", &uri, payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("Applied"));
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let (service, _, _, _) = build_service();
    let router = lending_router(service);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/loans/ln-999999")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_endpoint_rejects_non_positive_amounts() {
    let (service, _, _, _) = build_service();
    let record = service.submit(submission(), today()).expect("submits");
    super::common::advance_to(&service, &record.application_id, LoanStatus::Active);
    let reference = format!("{}-01", record.application_id.0);
    let router = lending_router(service);

    let uri = format!("/api/v1/periods/{reference}/payments");
    let response = router
        .oneshot(json_request("POST", &uri, json!({ "amount": 0.0 })))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn listing_endpoint_filters_by_status() {
    let (service, _, _, _) = build_service();
    service.submit(submission(), today()).expect("submits");
    let router = lending_router(service);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/loans?status=applied")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let listed = body.as_array().expect("array payload");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "Applied");
}
