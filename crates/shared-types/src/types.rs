use std::fmt;

/// Identifier of the signature request a signer was invited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SignatureRequestId(pub u64);

impl fmt::Display for SignatureRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SignatureRequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Form body of `POST /otp/send`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OtpSendForm {
    pub email: String,
    pub signature_request_id: SignatureRequestId,
}

/// Form body of `POST /otp/verify`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OtpVerifyForm {
    pub email: String,
    pub otp: String,
    pub signature_request_id: SignatureRequestId,
}

/// Form body of `POST /finalize`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FinalizeForm {
    pub email: String,
    pub signature_request_id: SignatureRequestId,
    /// PNG data URL (`data:image/png;base64,...`), absent when nothing was drawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_image: Option<String>,
}

/// JSON body returned by the signing endpoints
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
