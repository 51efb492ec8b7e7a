//! HTTP surface driven through the router with `oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{TestApp, TEST_USER_ID};
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-ID", TEST_USER_ID)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-User-ID", TEST_USER_ID)
        .body(Body::empty())
        .unwrap()
}

async fn create_profile(app: &Router) {
    let (status, _) = call(
        app,
        json_request(
            "PUT",
            "/api/profile",
            json!({
                "company_name": "Pixel Studio",
                "email": "hello@pixel.test",
                "tax_percent": "8",
                "brand_color": "#10b981"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_invoice(app: &Router) -> Value {
    let (status, body) = call(
        app,
        json_request(
            "POST",
            "/api/invoices",
            json!({
                "client_name": "Acme",
                "client_email": "ap@acme.test",
                "items": [{ "description": "Design", "quantity": "2", "rate": "50" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::new().router();

    let (status, body) = call(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoicing-service");

    let (status, _) = call(&app, Request::get("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_requires_user_header() {
    let app = TestApp::new().router();

    let (status, _) = call(
        &app,
        Request::get("/api/invoices").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_validation_errors_are_reported() {
    let app = TestApp::new().router();

    let (status, _) = call(
        &app,
        json_request(
            "PUT",
            "/api/profile",
            json!({ "company_name": "", "email": "not-an-email" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        json_request(
            "PUT",
            "/api/profile",
            json!({ "company_name": "Pixel", "email": "a@b.test", "brand_color": "teal" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, get("/api/profile")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invoice_without_profile_is_rejected() {
    let app = TestApp::new().router();

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/invoices",
            json!({
                "client_name": "Acme",
                "client_email": "ap@acme.test",
                "items": [{ "description": "Design", "quantity": "1", "rate": "10" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "company profile is required");
}

#[tokio::test]
async fn invoice_lifecycle_over_http() {
    let test_app = TestApp::new();
    let app = test_app.router();
    create_profile(&app).await;

    let invoice = create_invoice(&app).await;
    assert_eq!(invoice["invoice_number"], "INV-00001");
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["total"], "108.00");
    let id = invoice["invoice_id"].as_str().unwrap().to_string();

    // PDF download
    let response = app
        .clone()
        .oneshot(get(&format!("/api/invoices/{}/pdf", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"INV-00001.pdf\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    // Send without a body uses the default subject
    let (status, body) = call(
        &app,
        Request::post(format!("/api/invoices/{}/send", id))
            .header("X-User-ID", TEST_USER_ID)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sent: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(sent["invoice"]["status"], "sent");
    assert_eq!(sent["email_id"], "mock-email-1");
    assert_eq!(test_app.provider.sent()[0].subject, "Invoice INV-00001 from Pixel Studio");

    let (status, _) = call(
        &app,
        json_request("POST", &format!("/api/invoices/{}/viewed", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        json_request("POST", &format!("/api/invoices/{}/paid", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let settlement: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(settlement["invoice"]["status"], "paid");
    assert_eq!(settlement["newly_credited"], true);

    // Paying again is a no-op
    let (status, body) = call(
        &app,
        json_request("POST", &format!("/api/invoices/{}/paid", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let again: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(again["newly_credited"], false);

    // Sending a paid invoice conflicts
    let (status, _) = call(
        &app,
        json_request("POST", &format!("/api/invoices/{}/send", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, get("/api/income")).await;
    assert_eq!(status, StatusCode::OK);
    let income: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(income["entries"].as_array().unwrap().len(), 1);
    assert_eq!(income["entries"][0]["invoice_reference"], "INV-00001");

    let (status, body) = call(&app, get(&format!("/api/invoices/{}/emails", id))).await;
    assert_eq!(status, StatusCode::OK);
    let logs: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(logs[0]["status"], "sent");
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = TestApp::new().router();
    create_profile(&app).await;
    let first = create_invoice(&app).await;
    create_invoice(&app).await;

    let id = first["invoice_id"].as_str().unwrap();
    call(
        &app,
        json_request("POST", &format!("/api/invoices/{}/paid", id), json!({})),
    )
    .await;

    let (_, body) = call(&app, get("/api/invoices?status=pending")).await;
    let pending: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(pending["total"], 1);

    let (_, body) = call(&app, get("/api/invoices?status=paid")).await;
    let paid: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(paid["invoices"][0]["invoice_id"], id);

    let (status, _) = call(&app, get("/api/invoices?status=overdue")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_income_entry() {
    let app = TestApp::new().router();

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/income",
            json!({
                "amount": "300",
                "description": "Workshop",
                "date": "2024-04-02",
                "category": "consulting"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let entry: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entry["category"], "consulting");

    let (_, body) = call(&app, get("/api/income?limit=5")).await;
    let income: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(income["total"], "300");
}

#[tokio::test]
async fn contract_pdf_uses_company_profile() {
    let app = TestApp::new().router();
    let contract = json!({
        "contract_number": "AGR-7",
        "client_name": "Acme",
        "issue_date": "2024-05-01",
        "scope_of_work": "Website redesign",
        "rate_label": "$85/hour"
    });

    let (status, _) = call(&app, json_request("POST", "/api/contracts/pdf", contract.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    create_profile(&app).await;
    let (status, body) = call(&app, json_request("POST", "/api/contracts/pdf", contract)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn public_payment_page_flow() {
    let app = TestApp::new().router();
    create_profile(&app).await;
    let invoice = create_invoice(&app).await;
    let id = invoice["invoice_id"].as_str().unwrap();

    // No X-User-ID on the public routes
    let (status, body) = call(
        &app,
        Request::get(format!("/pay?invoice={}&amount=108.00", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["amount_matches"], true);
    assert_eq!(summary["brand_color"], "#10b981");

    let (status, body) = call(
        &app,
        Request::post("/pay")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "invoice_id": id,
                    "amount": "108.00",
                    "card_number": "4242424242424242",
                    "card_name": "Jane Client",
                    "expiry": "12/99",
                    "cvv": "123"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let receipt: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(receipt["card_last4"], "4242");

    let (_, body) = call(&app, get(&format!("/api/invoices/{}", id))).await;
    let stored: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stored["status"], "paid");
}
