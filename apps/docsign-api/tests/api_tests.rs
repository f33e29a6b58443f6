//! Router tests for the OTP and finalize endpoints

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use docsign_api::{router, AppState};
use http_body_util::BodyExt;
use proptest::prelude::*;
use shared_types::SignatureRequestId;
use tower::ServiceExt;

fn app() -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(Duration::minutes(30)));
    (state.clone(), router(state))
}

fn form_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check() {
    let (_, app) = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn send_then_verify() {
    let (state, app) = app();

    let response = app
        .clone()
        .oneshot(form_post(
            "/otp/send",
            "email=a%40b.com&signature_request_id=42".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "OTP sent successfully");

    let code = state.issued_code("a@b.com").unwrap();
    let wrong = if code == "999999" { "999998" } else { "999999" };

    let response = app
        .clone()
        .oneshot(form_post(
            "/otp/verify",
            format!("email=a%40b.com&otp={}&signature_request_id=42", wrong),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid OTP");

    let response = app
        .oneshot(form_post(
            "/otp/verify",
            format!("email=a%40b.com&otp={}&signature_request_id=42", code),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.is_verified("a@b.com", SignatureRequestId(42)));
}

#[tokio::test]
async fn verify_without_send_is_rejected() {
    let (_, app) = app();
    let response = app
        .oneshot(form_post(
            "/otp/verify",
            "email=a%40b.com&otp=123456&signature_request_id=42".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "OTP not found");
}

#[tokio::test]
async fn send_rejects_bad_email() {
    let (_, app) = app();
    let response = app
        .oneshot(form_post(
            "/otp/send",
            "email=nobody&signature_request_id=42".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn finalize_requires_verification() {
    let (_, app) = app();
    let response = app
        .oneshot(form_post(
            "/finalize",
            "email=a%40b.com&signature_request_id=42".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn finalize_stores_signature() {
    let (state, app) = app();
    let code = state.issue_otp("a@b.com", SignatureRequestId(42));
    state
        .verify_otp("a@b.com", &code, SignatureRequestId(42))
        .unwrap();

    // 1x1 transparent PNG
    let png = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
    let body = format!(
        "email=a%40b.com&signature_request_id=42&signature_image=data%3Aimage%2Fpng%3Bbase64%2C{}",
        png.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D")
    );
    let response = app.oneshot(form_post("/finalize", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "Document successfully signed!"
    );

    let stored = state.signature("a@b.com", SignatureRequestId(42)).unwrap();
    assert!(stored.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[tokio::test]
async fn finalize_rejects_non_png() {
    let (state, app) = app();
    let code = state.issue_otp("a@b.com", SignatureRequestId(42));
    state
        .verify_otp("a@b.com", &code, SignatureRequestId(42))
        .unwrap();

    let response = app
        .oneshot(form_post(
            "/finalize",
            "email=a%40b.com&signature_request_id=42&signature_image=hello".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn only_the_issued_code_verifies(guess in "[0-9]{6}", id in 1u64..1000) {
        let state = AppState::new(Duration::minutes(30));
        let code = state.issue_otp("signer@example.com", SignatureRequestId(id));
        let result = state.verify_otp("signer@example.com", &guess, SignatureRequestId(id));
        prop_assert_eq!(result.is_ok(), guess == code);
    }
}
