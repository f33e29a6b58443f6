//! Error types for DocSign API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("OTP not found")]
    OtpNotFound,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("OTP has not been verified for this signature request")]
    NotVerified,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::OtpNotFound | ApiError::OtpExpired | ApiError::InvalidOtp => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::NotVerified => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
