//! HTTP handlers for DocSign API

use std::sync::Arc;

use axum::{extract::State, response::Html, Form, Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use shared_types::{FinalizeForm, MessageResponse, OtpSendForm, OtpVerifyForm};

use crate::error::ApiError;
use crate::state::AppState;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Issue a code for the signer.
///
/// There is no mail channel in development, so the code goes to the log.
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Form(form): Form<OtpSendForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_email(&form.email)?;

    let code = state.issue_otp(&form.email, form.signature_request_id);
    tracing::info!(
        email = %form.email,
        signature_request_id = %form.signature_request_id,
        code = %code,
        "OTP issued"
    );

    Ok(Json(MessageResponse::new("OTP sent successfully")))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Form(form): Form<OtpVerifyForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("Verifying OTP for {}", form.email);

    if let Err(e) = state.verify_otp(&form.email, &form.otp, form.signature_request_id) {
        tracing::warn!("{} for {}", e, form.email);
        return Err(e);
    }

    tracing::info!("OTP verified for {}", form.email);
    Ok(Json(MessageResponse::new("OTP verified successfully")))
}

/// Accept the final signature once the signer's code has been verified
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FinalizeForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.is_verified(&form.email, form.signature_request_id) {
        return Err(ApiError::NotVerified);
    }

    if let Some(data_url) = &form.signature_image {
        let png = decode_png_data_url(data_url)?;
        tracing::info!(
            "Saved {} byte signature for {} on request {}",
            png.len(),
            form.email,
            form.signature_request_id
        );
        state.store_signature(&form.email, form.signature_request_id, png);
    }

    tracing::info!(
        "Signature request {} signed by {}",
        form.signature_request_id,
        form.email
    );
    Ok(Json(MessageResponse::new("Document successfully signed!")))
}

pub async fn success() -> Html<&'static str> {
    Html("<h1>Document successfully signed!</h1>")
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest(format!("Invalid email: {}", email)))
    }
}

fn decode_png_data_url(data_url: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = data_url
        .strip_prefix("data:image/png;base64,")
        .ok_or_else(|| ApiError::InvalidRequest("Signature must be a PNG data URL".to_string()))?;

    let png = BASE64
        .decode(encoded)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid signature base64: {}", e)))?;

    if !png.starts_with(&PNG_MAGIC) {
        return Err(ApiError::InvalidRequest(
            "Signature is not a PNG image".to_string(),
        ));
    }
    Ok(png)
}
