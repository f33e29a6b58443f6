//! Error types for the signing controller

use thiserror::Error;

use crate::controller::SessionState;
use crate::otp::OtpPhase;

/// Failure of a request to the signing service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),

    #[error("Server rejected request with status {status}")]
    Rejected { status: u16 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("An OTP request is already in flight")]
    RequestInFlight,

    #[error("Cannot {action} while OTP is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: OtpPhase,
    },

    #[error("OTP code must not be empty")]
    EmptyCode,

    #[error("OTP has already been verified")]
    AlreadyVerified,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Canvas must have non-zero dimensions, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encoding(String),
}

impl From<png::EncodingError> for RenderError {
    fn from(e: png::EncodingError) -> Self {
        RenderError::Encoding(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("A signing session needs at least one document")]
    NoDocuments,

    #[error("Cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("A finalize request is already in flight")]
    FinalizeInFlight,

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to render signature: {0}")]
    Render(#[from] RenderError),
}

/// Coarse classification used when surfacing errors to the signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkFailure,
    RejectedByServer,
    InvalidInput,
    Internal,
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network(_) => ErrorKind::NetworkFailure,
            TransportError::Rejected { .. } => ErrorKind::RejectedByServer,
        }
    }
}

impl SigningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigningError::Transport(e) => e.kind(),
            SigningError::Render(_) => ErrorKind::Internal,
            SigningError::NoDocuments
            | SigningError::InvalidState { .. }
            | SigningError::FinalizeInFlight
            | SigningError::Otp(_) => ErrorKind::InvalidInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let network: SigningError = TransportError::Network("connection reset".into()).into();
        assert_eq!(network.kind(), ErrorKind::NetworkFailure);

        let rejected: SigningError = TransportError::Rejected { status: 401 }.into();
        assert_eq!(rejected.kind(), ErrorKind::RejectedByServer);

        let empty: SigningError = OtpError::EmptyCode.into();
        assert_eq!(empty.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_messages() {
        let err = OtpError::InvalidPhase {
            action: "verify",
            phase: OtpPhase::Idle,
        };
        assert_eq!(err.to_string(), "Cannot verify while OTP is idle");
        assert_eq!(
            TransportError::Rejected { status: 500 }.to_string(),
            "Server rejected request with status 500"
        );
    }
}
