//! DocSign - browser bindings for the signer's page
//!
//! Wires the review-gated signing controller from `docsign-core` to the DOM:
//! page images and their scroll container, the signature canvas, and `fetch`
//! for the OTP and finalize endpoints.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub mod listeners;
pub mod page;
pub mod transport;

pub use listeners::EventListenerGuard;
pub use page::SigningPage;
pub use transport::FetchTransport;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"DocSign WASM initialized".into());
}

/// Parse a document link's `data-urls` attribute into page URLs (called from JS)
#[wasm_bindgen]
pub fn parse_page_urls(raw: &str) -> Result<js_sys::Array, JsValue> {
    let urls = shared_types::parse_page_urls(raw).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(urls.into_iter().map(JsValue::from).collect())
}

/// Best-effort message from a thrown JS value
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}
