//! DocSign API - development backend for the signer's page
//!
//! Implements the endpoints the signing controller talks to:
//! - `POST /otp/send` - issue a six-digit code
//! - `POST /otp/verify` - check a code
//! - `POST /finalize` - accept the drawn signature after verification
//!
//! All bodies are form-encoded; responses are JSON.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // OTP challenge
        .route("/otp/send", post(handlers::send_otp))
        .route("/otp/verify", post(handlers::verify_otp))
        // Signature finalization
        .route("/finalize", post(handlers::finalize))
        .route("/success", get(handlers::success))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
