//! Requests to the signing service
//!
//! All three endpoints take form-encoded bodies; any 2xx status is success.

use async_trait::async_trait;
use shared_types::{FinalizeForm, OtpSendForm, OtpVerifyForm};

use crate::error::TransportError;

/// Remote side of the signing flow.
///
/// Futures are not required to be `Send` so browser fetch implementations fit.
#[async_trait(?Send)]
pub trait SigningTransport {
    async fn send_otp(&self, form: &OtpSendForm) -> Result<(), TransportError>;

    async fn verify_otp(&self, form: &OtpVerifyForm) -> Result<(), TransportError>;

    async fn finalize(&self, form: &FinalizeForm) -> Result<(), TransportError>;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use serde::Serialize;
    use tracing::debug;

    use super::*;
    use crate::config::SigningConfig;

    /// `reqwest`-backed transport for native clients and tests
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        send_otp_url: String,
        verify_otp_url: String,
        finalize_url: String,
    }

    impl HttpTransport {
        pub fn new(config: &SigningConfig) -> Self {
            Self::with_client(reqwest::Client::new(), config)
        }

        pub fn with_client(client: reqwest::Client, config: &SigningConfig) -> Self {
            Self {
                client,
                send_otp_url: config.send_otp_url(),
                verify_otp_url: config.verify_otp_url(),
                finalize_url: config.finalize_url(),
            }
        }

        async fn post_form<F: Serialize + ?Sized>(
            &self,
            url: &str,
            form: &F,
        ) -> Result<(), TransportError> {
            let response = self
                .client
                .post(url)
                .form(form)
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status = response.status();
            debug!(url, status = status.as_u16(), "Signing service responded");
            if status.is_success() {
                Ok(())
            } else {
                Err(TransportError::Rejected {
                    status: status.as_u16(),
                })
            }
        }
    }

    #[async_trait(?Send)]
    impl SigningTransport for HttpTransport {
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
}
