//! `fetch`-backed transport for the signing endpoints

use async_trait::async_trait;
use docsign_core::{SigningConfig, SigningTransport, TransportError};
use serde::Serialize;
use serde_json::Value;
use shared_types::{FinalizeForm, OtpSendForm, OtpVerifyForm};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::js_error_message;

#[derive(Debug, Clone)]
pub struct FetchTransport {
    send_otp_url: String,
    verify_otp_url: String,
    finalize_url: String,
}

impl FetchTransport {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            send_otp_url: config.send_otp_url(),
            verify_otp_url: config.verify_otp_url(),
            finalize_url: config.finalize_url(),
        }
    }

    async fn post_form<F: Serialize>(&self, url: &str, form: &F) -> Result<(), TransportError> {
        let body = encode_form(form)?;
        let status = post(url, &body)
            .await
            .map_err(|e| TransportError::Network(js_error_message(&e)))?;

        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(TransportError::Rejected { status })
        }
    }
}

#[async_trait(?Send)]
impl SigningTransport for FetchTransport {
    async fn send_otp(&self, form: &OtpSendForm) -> Result<(), TransportError> {
        self.post_form(&self.send_otp_url, form).await
    }

    async fn verify_otp(&self, form: &OtpVerifyForm) -> Result<(), TransportError> {
        self.post_form(&self.verify_otp_url, form).await
    }

    async fn finalize(&self, form: &FinalizeForm) -> Result<(), TransportError> {
        self.post_form(&self.finalize_url, form).await
    }
}

async fn post(url: &str, body: &str) -> Result<u16, JsValue> {
    let window = web_sys::window().ok_or("No window")?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(body));

    let request = Request::new_with_str_and_init(url, &opts)?;
    request
        .headers()
        .set("Content-Type", "application/x-www-form-urlencoded")?;

    let response = JsFuture::from(window.fetch_with_request(&request)).await?;
    let response: Response = response.dyn_into()?;
    Ok(response.status())
}

/// `application/x-www-form-urlencoded` body for a flat form struct.
/// `None` fields are left out.
pub(crate) fn encode_form<F: Serialize>(form: &F) -> Result<String, TransportError> {
    let value = serde_json::to_value(form)
        .map_err(|e| TransportError::Network(format!("Failed to encode form: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(TransportError::Network(
            "Failed to encode form: expected a struct".to_string(),
        ));
    };

    let pairs: Vec<String> = fields
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&value)
            ))
        })
        .collect();
    Ok(pairs.join("&"))
}
