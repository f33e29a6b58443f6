//! Document signing core logic
//!
//! Client-side controller for the signer's page: documents must be scrolled
//! to their end before signing is enabled, and a signature is only finalized
//! after a one-time passcode sent to the signer's email has been verified.
//!
//! The pieces, leaf first:
//! - [`stroke`]: handwritten signature capture and PNG rendering
//! - [`review`]: per-document read tracking
//! - [`navigation`]: next/previous/sign enablement
//! - [`otp`]: the send/verify passcode challenge
//! - [`controller`]: the session state machine that ties them together

pub mod config;
pub mod controller;
pub mod error;
pub mod navigation;
pub mod otp;
pub mod review;
pub mod stroke;
pub mod transport;

pub use config::{CanvasConfig, SigningConfig};
pub use controller::{
    NoticeLevel, PendingRequest, SessionEvent, SessionState, SigningFlow, SigningSessionController,
};
pub use error::{ErrorKind, OtpError, RenderError, SigningError, TransportError};
pub use navigation::{ControlState, NavigationGate, NavigationPolicy};
pub use otp::{OtpChallenge, OtpControls, OtpPhase, RequestKind, RequestTicket};
pub use review::{DocumentEntry, DocumentReviewTracker, ReviewProgress, ScrollMetrics};
pub use shared_types::{FinalizeForm, OtpSendForm, OtpVerifyForm, SignatureRequestId};
pub use stroke::{Point, SignatureImage, Stroke, StrokeCapture};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::SigningTransport;
