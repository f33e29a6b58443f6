//! Signing session controller
//!
//! Ties review tracking, control gating, the OTP challenge and signature
//! capture into one consent workflow:
//!
//! ```text
//! Reviewing ─(all read)─▶ ReadyToSign ─(sign)─▶ AwaitingOtp ─(verified)─▶ OtpEntered ─(finalized)─▶ Signed
//! ```
//!
//! Network calls are split into `begin_*`/`complete_*` pairs so the controller
//! never holds a borrow across an await point. [`SigningFlow`] drives those
//! pairs against a [`SigningTransport`].

use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use shared_types::{FinalizeForm, OtpSendForm, OtpVerifyForm, SignatureRequestId};
use tracing::{debug, info, warn};

use crate::config::SigningConfig;
use crate::error::{OtpError, SigningError, TransportError};
use crate::navigation::{ControlState, NavigationGate};
use crate::otp::{OtpChallenge, OtpControls, OtpPhase, RequestKind, RequestTicket};
use crate::review::{DocumentReviewTracker, ReviewProgress};
use crate::stroke::{Point, SignatureImage, StrokeCapture};
use crate::transport::SigningTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Reviewing,
    ReadyToSign,
    AwaitingOtp,
    OtpEntered,
    Signed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Reviewing => write!(f, "reviewing"),
            SessionState::ReadyToSign => write!(f, "ready to sign"),
            SessionState::AwaitingOtp => write!(f, "awaiting OTP"),
            SessionState::OtpEntered => write!(f, "OTP entered"),
            SessionState::Signed => write!(f, "signed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Something the page should show or act on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    DocumentRead { index: usize },
    SigningEnabled,
    ModalOpened,
    ModalClosed,
    SignatureSaved { blank: bool },
    OtpSent,
    OtpVerified,
    Notice { level: NoticeLevel, message: String },
    Signed { redirect: String },
}

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest<F> {
    pub ticket: RequestTicket,
    pub form: F,
}

/// State owned by the open signing modal
#[derive(Debug)]
struct SigningModal {
    capture: StrokeCapture,
    saved: Option<SignatureImage>,
}

#[derive(Debug)]
pub struct SigningSessionController {
    config: SigningConfig,
    tracker: DocumentReviewTracker,
    gate: NavigationGate,
    otp: OtpChallenge,
    state: SessionState,
    modal: Option<SigningModal>,
    finalize_in_flight: Option<RequestTicket>,
    events: VecDeque<SessionEvent>,
}

impl SigningSessionController {
    /// Start a session over `documents`, each given as its ordered page URLs
    pub fn new(
        config: SigningConfig,
        email: impl Into<String>,
        signature_request_id: SignatureRequestId,
        documents: Vec<Vec<String>>,
    ) -> Result<Self, SigningError> {
        if documents.is_empty() {
            return Err(SigningError::NoDocuments);
        }

        let tracker =
            DocumentReviewTracker::with_documents(documents).with_tolerance(config.scroll_tolerance);
        let gate = NavigationGate::new(config.navigation_policy);
        let otp = OtpChallenge::new(email, signature_request_id);

        info!(
            %signature_request_id,
            documents = tracker.document_count(),
            policy = ?gate.policy(),
            "Signing session started"
        );

        Ok(Self {
            config,
            tracker,
            gate,
            otp,
            state: SessionState::Reviewing,
            modal: None,
            finalize_in_flight: None,
            events: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tracker(&self) -> &DocumentReviewTracker {
        &self.tracker
    }

    pub fn otp_phase(&self) -> OtpPhase {
        self.otp.phase()
    }

    pub fn otp_code(&self) -> &str {
        self.otp.code()
    }

    pub fn progress(&self) -> ReviewProgress {
        self.tracker.progress()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn saved_signature(&self) -> Option<&SignatureImage> {
        self.modal.as_ref().and_then(|m| m.saved.as_ref())
    }

    pub fn stroke_count(&self) -> usize {
        self.modal.as_ref().map_or(0, |m| m.capture.strokes().len())
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalize_in_flight.is_some()
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn controls(&self) -> ControlState {
        let mut controls = self.gate.controls(&self.tracker);
        controls.sign_enabled &= self.state != SessionState::Signed;
        controls
    }

    pub fn otp_controls(&self) -> OtpControls {
        if self.state == SessionState::AwaitingOtp {
            self.otp.controls()
        } else {
            OtpControls {
                send_enabled: false,
                code_input_enabled: false,
                verify_enabled: false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------

    pub fn select_document(&mut self, index: usize) -> bool {
        self.tracker.select_document(index)
    }

    pub fn next_document(&mut self) -> bool {
        if !self.gate.can_go_next(&self.tracker) {
            return false;
        }
        let next = self.tracker.current_index() + 1;
        self.tracker.select_document(next)
    }

    pub fn prev_document(&mut self) -> bool {
        if !self.gate.can_go_prev(&self.tracker) {
            return false;
        }
        let prev = self.tracker.current_index() - 1;
        self.tracker.select_document(prev)
    }

    pub fn on_scroll(
        &mut self,
        index: usize,
        scroll_top: f64,
        scroll_height: f64,
        viewport_height: f64,
    ) -> bool {
        if !self.is_displayed(index) {
            return false;
        }
        let newly_read =
            self.tracker
                .on_scroll_progress(index, scroll_top, scroll_height, viewport_height);
        self.after_observation(index, newly_read)
    }

    /// Run the end-of-content check for a document that was just displayed
    pub fn on_document_displayed(
        &mut self,
        index: usize,
        scroll_height: f64,
        viewport_height: f64,
    ) -> bool {
        if !self.is_displayed(index) {
            return false;
        }
        let newly_read = self
            .tracker
            .on_displayed(index, scroll_height, viewport_height);
        self.after_observation(index, newly_read)
    }

    /// Only the document on screen can be read
    fn is_displayed(&self, index: usize) -> bool {
        let current = self.tracker.current_index();
        if index != current {
            debug!(index, current, "Ignoring observation for a document not on screen");
            return false;
        }
        true
    }

    fn after_observation(&mut self, index: usize, newly_read: bool) -> bool {
        if newly_read {
            self.events.push_back(SessionEvent::DocumentRead { index });
        }
        if self.state == SessionState::Reviewing && self.gate.can_sign(&self.tracker) {
            self.state = SessionState::ReadyToSign;
            info!("All documents read, signing enabled");
            self.events.push_back(SessionEvent::SigningEnabled);
        }
        newly_read
    }

    // ------------------------------------------------------------------
    // Signing modal
    // ------------------------------------------------------------------

    /// Open (or re-open) the consent and signature modal.
    ///
    /// Always starts from a clean OTP challenge and an empty signature pad.
    pub fn open_signing_modal(&mut self) -> Result<(), SigningError> {
        match self.state {
            SessionState::ReadyToSign | SessionState::AwaitingOtp | SessionState::OtpEntered => {}
            state => {
                return Err(SigningError::InvalidState {
                    action: "open the signing modal",
                    state,
                })
            }
        }

        self.otp.reset();
        self.finalize_in_flight = None;
        self.modal = Some(SigningModal {
            capture: StrokeCapture::new(self.config.canvas),
            saved: None,
        });
        self.state = SessionState::AwaitingOtp;
        debug!(generation = self.otp.generation(), "Signing modal opened");
        self.events.push_back(SessionEvent::ModalOpened);
        Ok(())
    }

    /// Close the modal without signing. Review progress is kept.
    pub fn dismiss_modal(&mut self) -> bool {
        if self.modal.take().is_none() {
            return false;
        }
        // Invalidate whatever is still in flight for this modal
        self.otp.reset();
        self.finalize_in_flight = None;
        if self.state != SessionState::Signed {
            self.state = SessionState::ReadyToSign;
        }
        debug!("Signing modal dismissed");
        self.events.push_back(SessionEvent::ModalClosed);
        true
    }

    pub fn begin_stroke(&mut self, point: Point) -> bool {
        self.modal
            .as_mut()
            .is_some_and(|m| m.capture.begin_stroke(point))
    }

    pub fn extend_stroke(&mut self, point: Point) -> bool {
        self.modal
            .as_mut()
            .is_some_and(|m| m.capture.extend_stroke(point))
    }

    pub fn end_stroke(&mut self) -> bool {
        self.modal.as_mut().is_some_and(|m| m.capture.end_stroke())
    }

    /// Wipe the pad and any saved rendering
    pub fn clear_signature(&mut self) {
        if let Some(modal) = self.modal.as_mut() {
            modal.capture.clear();
            modal.saved = None;
        }
    }

    /// Render the pad and keep the result for finalization
    pub fn save_signature(&mut self) -> Result<Option<&SignatureImage>, SigningError> {
        let state = self.state;
        let modal = self.modal.as_mut().ok_or(SigningError::InvalidState {
            action: "save a signature",
            state,
        })?;

        let image = modal.capture.render()?;
        let blank = image.is_blank();
        modal.saved = (!blank).then_some(image);
        debug!(blank, "Signature saved");
        self.events.push_back(SessionEvent::SignatureSaved { blank });
        Ok(self.saved_signature())
    }

    // ------------------------------------------------------------------
    // OTP
    // ------------------------------------------------------------------

    pub fn set_otp_code(&mut self, code: impl Into<String>) {
        self.otp.set_code(code);
    }

    pub fn begin_send_otp(&mut self) -> Result<PendingRequest<OtpSendForm>, SigningError> {
        self.require_state(SessionState::AwaitingOtp, "send a code")?;
        let (ticket, form) = self.otp.begin_send()?;
        Ok(PendingRequest { ticket, form })
    }

    /// Returns the resulting phase, or `None` if the response arrived for a
    /// modal that has since been reset or closed.
    pub fn complete_send_otp(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<(), TransportError>,
    ) -> Option<OtpPhase> {
        let phase = self.otp.complete_send(ticket, &outcome)?;
        match outcome {
            Ok(()) => {
                self.events.push_back(SessionEvent::OtpSent);
                self.notice(NoticeLevel::Info, "OTP sent successfully".to_string());
            }
            Err(TransportError::Rejected { .. }) => {
                self.notice(NoticeLevel::Error, "Failed to send OTP".to_string())
            }
            Err(TransportError::Network(e)) => {
                self.notice(NoticeLevel::Error, format!("Error sending OTP: {}", e))
            }
        }
        Some(phase)
    }

    pub fn begin_verify_otp(&mut self) -> Result<PendingRequest<OtpVerifyForm>, SigningError> {
        self.require_state(SessionState::AwaitingOtp, "verify a code")?;
        match self.otp.begin_verify() {
            Ok((ticket, form)) => Ok(PendingRequest { ticket, form }),
            Err(OtpError::EmptyCode) => {
                self.notice(NoticeLevel::Error, "Please enter the OTP code".to_string());
                Err(OtpError::EmptyCode.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn complete_verify_otp(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<(), TransportError>,
    ) -> Option<OtpPhase> {
        let phase = self.otp.complete_verify(ticket, &outcome)?;
        match outcome {
            Ok(()) => {
                self.state = SessionState::OtpEntered;
                self.events.push_back(SessionEvent::OtpVerified);
            }
            Err(TransportError::Rejected { .. }) => {
                self.notice(NoticeLevel::Error, "Failed to verify OTP".to_string())
            }
            Err(TransportError::Network(e)) => {
                self.notice(NoticeLevel::Error, format!("Error verifying OTP: {}", e))
            }
        }
        Some(phase)
    }

    // ------------------------------------------------------------------
    // Finalize
    // ------------------------------------------------------------------

    pub fn begin_finalize(&mut self) -> Result<PendingRequest<FinalizeForm>, SigningError> {
        self.require_state(SessionState::OtpEntered, "finalize")?;
        if self.finalize_in_flight.is_some() {
            return Err(SigningError::FinalizeInFlight);
        }

        let signature_image = match self.modal.as_ref() {
            Some(SigningModal {
                saved: Some(image), ..
            }) => Some(image.to_data_url()),
            Some(modal) if !modal.capture.is_empty() => {
                let image = modal.capture.render()?;
                (!image.is_blank()).then(|| image.to_data_url())
            }
            _ => None,
        };

        let ticket = self.otp.ticket(RequestKind::Finalize);
        self.finalize_in_flight = Some(ticket);
        info!(
            signature_request_id = %self.otp.signature_request_id(),
            drawn = signature_image.is_some(),
            "Finalizing signature"
        );

        Ok(PendingRequest {
            ticket,
            form: FinalizeForm {
                email: self.otp.email().to_string(),
                signature_request_id: self.otp.signature_request_id(),
                signature_image,
            },
        })
    }

    pub fn complete_finalize(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<(), TransportError>,
    ) -> Option<SessionState> {
        if self.finalize_in_flight != Some(ticket) {
            debug!("Dropping stale finalize response");
            return None;
        }
        self.finalize_in_flight = None;

        match outcome {
            Ok(()) => {
                self.state = SessionState::Signed;
                self.modal = None;
                info!(signature_request_id = %self.otp.signature_request_id(), "Document signed");
                self.notice(NoticeLevel::Info, "Document signed successfully".to_string());
                self.events.push_back(SessionEvent::ModalClosed);
                self.events.push_back(SessionEvent::Signed {
                    redirect: self.config.success_redirect.clone(),
                });
            }
            Err(TransportError::Rejected { status }) => {
                warn!(status, "Finalize rejected");
                self.notice(NoticeLevel::Error, "Failed to sign document".to_string());
            }
            Err(TransportError::Network(e)) => {
                warn!(error = %e, "Finalize failed");
                self.notice(NoticeLevel::Error, format!("Error signing document: {}", e));
            }
        }
        Some(self.state)
    }

    fn require_state(
        &self,
        expected: SessionState,
        action: &'static str,
    ) -> Result<(), SigningError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SigningError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn notice(&mut self, level: NoticeLevel, message: String) {
        self.events.push_back(SessionEvent::Notice { level, message });
    }
}

/// Runs controller requests against a transport.
///
/// The controller lives in a `RefCell` that is only borrowed between await
/// points, so overlapping calls on one thread see each other's phase changes.
pub struct SigningFlow<T> {
    controller: RefCell<SigningSessionController>,
    transport: T,
}

impl<T: SigningTransport> SigningFlow<T> {
    pub fn new(controller: SigningSessionController, transport: T) -> Self {
        Self {
            controller: RefCell::new(controller),
            transport,
        }
    }

    pub fn controller(&self) -> Ref<'_, SigningSessionController> {
        self.controller.borrow()
    }

    pub fn controller_mut(&self) -> RefMut<'_, SigningSessionController> {
        self.controller.borrow_mut()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_controller(self) -> SigningSessionController {
        self.controller.into_inner()
    }

    pub async fn send_otp(&self) -> Result<Option<OtpPhase>, SigningError> {
        let pending = self.controller.borrow_mut().begin_send_otp()?;
        let outcome = self.transport.send_otp(&pending.form).await;
        Ok(self
            .controller
            .borrow_mut()
            .complete_send_otp(pending.ticket, outcome))
    }

    pub async fn verify_otp(&self) -> Result<Option<OtpPhase>, SigningError> {
        let pending = self.controller.borrow_mut().begin_verify_otp()?;
        let outcome = self.transport.verify_otp(&pending.form).await;
        Ok(self
            .controller
            .borrow_mut()
            .complete_verify_otp(pending.ticket, outcome))
    }

    pub async fn finalize(&self) -> Result<Option<SessionState>, SigningError> {
        let pending = self.controller.borrow_mut().begin_finalize()?;
        let outcome = self.transport.finalize(&pending.form).await;
        Ok(self
            .controller
            .borrow_mut()
            .complete_finalize(pending.ticket, outcome))
    }

    /// Verify the entered code and, once verified, finalize straight away
    pub async fn submit_otp(&self) -> Result<SessionState, SigningError> {
        if self.verify_otp().await? == Some(OtpPhase::Verified) {
            self.finalize().await?;
        }
        Ok(self.controller.borrow().state())
    }
}
