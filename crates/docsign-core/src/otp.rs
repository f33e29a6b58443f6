//! One-time passcode challenge
//!
//! The challenge is split into `begin_*` and `complete_*` halves around the
//! network call. `begin_*` moves the phase to `Sending`/`Verifying` and hands
//! out a [`RequestTicket`]; a second request of the same kind is refused until
//! the matching `complete_*` runs. Tickets issued before a [`reset`] are stale
//! and their completions are dropped.
//!
//! [`reset`]: OtpChallenge::reset

use std::fmt;

use serde::Serialize;
use shared_types::{OtpSendForm, OtpVerifyForm, SignatureRequestId};
use tracing::{debug, info, warn};

use crate::error::{OtpError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPhase {
    Idle,
    Sending,
    Sent,
    Verifying,
    Verified,
    Failed,
}

impl fmt::Display for OtpPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpPhase::Idle => write!(f, "idle"),
            OtpPhase::Sending => write!(f, "sending"),
            OtpPhase::Sent => write!(f, "sent"),
            OtpPhase::Verifying => write!(f, "verifying"),
            OtpPhase::Verified => write!(f, "verified"),
            OtpPhase::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    SendOtp,
    VerifyOtp,
    Finalize,
}

/// Identifies one in-flight request and the modal session that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub(crate) generation: u64,
    pub(crate) kind: RequestKind,
}

impl RequestTicket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// Which OTP controls the signer can use right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OtpControls {
    pub send_enabled: bool,
    pub code_input_enabled: bool,
    pub verify_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct OtpChallenge {
    email: String,
    signature_request_id: SignatureRequestId,
    phase: OtpPhase,
    code: String,
    generation: u64,
}

impl OtpChallenge {
    pub fn new(email: impl Into<String>, signature_request_id: SignatureRequestId) -> Self {
        Self {
            email: email.into(),
            signature_request_id,
            phase: OtpPhase::Idle,
            code: String::new(),
            generation: 0,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn signature_request_id(&self) -> SignatureRequestId {
        self.signature_request_id
    }

    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, OtpPhase::Sending | OtpPhase::Verifying)
    }

    /// Record the code typed by the signer
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Start over: back to `Idle`, code cleared, outstanding tickets invalidated
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = OtpPhase::Idle;
        self.code.clear();
        debug!(generation = self.generation, "OTP challenge reset");
    }

    pub fn controls(&self) -> OtpControls {
        OtpControls {
            send_enabled: matches!(
                self.phase,
                OtpPhase::Idle | OtpPhase::Sent | OtpPhase::Failed
            ),
            code_input_enabled: matches!(self.phase, OtpPhase::Sent | OtpPhase::Failed),
            verify_enabled: matches!(self.phase, OtpPhase::Sent | OtpPhase::Failed),
        }
    }

    /// Start a send request. Allowed from `Idle` and `Failed`, and from `Sent`
    /// so the signer can ask for the code again.
    pub fn begin_send(&mut self) -> Result<(RequestTicket, OtpSendForm), OtpError> {
        match self.phase {
            OtpPhase::Sending | OtpPhase::Verifying => return Err(OtpError::RequestInFlight),
            OtpPhase::Verified => return Err(OtpError::AlreadyVerified),
            OtpPhase::Idle | OtpPhase::Sent | OtpPhase::Failed => {}
        }

        self.phase = OtpPhase::Sending;
        info!(signature_request_id = %self.signature_request_id, "Sending OTP");

        let form = OtpSendForm {
            email: self.email.clone(),
            signature_request_id: self.signature_request_id,
        };
        Ok((self.ticket(RequestKind::SendOtp), form))
    }

    /// Apply the outcome of a send request. Returns the new phase, or `None`
    /// when the ticket is stale.
    pub fn complete_send(
        &mut self,
        ticket: RequestTicket,
        outcome: &Result<(), TransportError>,
    ) -> Option<OtpPhase> {
        if !self.accepts(ticket, RequestKind::SendOtp, OtpPhase::Sending) {
            return None;
        }

        self.phase = match outcome {
            Ok(()) => {
                info!(signature_request_id = %self.signature_request_id, "OTP sent");
                OtpPhase::Sent
            }
            Err(e) => {
                warn!(signature_request_id = %self.signature_request_id, error = %e, "OTP send failed");
                OtpPhase::Failed
            }
        };
        Some(self.phase)
    }

    pub fn begin_verify(&mut self) -> Result<(RequestTicket, OtpVerifyForm), OtpError> {
        match self.phase {
            OtpPhase::Sending | OtpPhase::Verifying => return Err(OtpError::RequestInFlight),
            OtpPhase::Verified => return Err(OtpError::AlreadyVerified),
            OtpPhase::Idle => {
                return Err(OtpError::InvalidPhase {
                    action: "verify",
                    phase: self.phase,
                })
            }
            OtpPhase::Sent | OtpPhase::Failed => {}
        }

        let code = self.code.trim();
        if code.is_empty() {
            return Err(OtpError::EmptyCode);
        }

        let form = OtpVerifyForm {
            email: self.email.clone(),
            otp: code.to_string(),
            signature_request_id: self.signature_request_id,
        };

        self.phase = OtpPhase::Verifying;
        info!(signature_request_id = %self.signature_request_id, "Verifying OTP");
        Ok((self.ticket(RequestKind::VerifyOtp), form))
    }

    /// Apply the outcome of a verify request. A rejected code falls back to
    /// `Sent` so the signer can retry without requesting a new one.
    pub fn complete_verify(
        &mut self,
        ticket: RequestTicket,
        outcome: &Result<(), TransportError>,
    ) -> Option<OtpPhase> {
        if !self.accepts(ticket, RequestKind::VerifyOtp, OtpPhase::Verifying) {
            return None;
        }

        self.phase = match outcome {
            Ok(()) => {
                info!(signature_request_id = %self.signature_request_id, "OTP verified");
                OtpPhase::Verified
            }
            Err(e) => {
                warn!(signature_request_id = %self.signature_request_id, error = %e, "OTP verification failed");
                OtpPhase::Sent
            }
        };
        Some(self.phase)
    }

    pub(crate) fn ticket(&self, kind: RequestKind) -> RequestTicket {
        RequestTicket {
            generation: self.generation,
            kind,
        }
    }

    fn accepts(&self, ticket: RequestTicket, kind: RequestKind, expected: OtpPhase) -> bool {
        let fresh = ticket.generation == self.generation && ticket.kind == kind;
        if !fresh || self.phase != expected {
            debug!(
                ?kind,
                ticket_generation = ticket.generation,
                generation = self.generation,
                phase = %self.phase,
                "Dropping stale OTP response"
            );
            return false;
        }
        true
    }
}
