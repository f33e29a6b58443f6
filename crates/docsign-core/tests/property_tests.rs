//! Property-based tests for the signing controller

use docsign_core::{
    NavigationPolicy, OtpPhase, SessionState, SignatureRequestId, SigningConfig,
    SigningSessionController, TransportError,
};
use proptest::prelude::*;

fn controller(count: usize, policy: NavigationPolicy) -> SigningSessionController {
    let config = SigningConfig {
        navigation_policy: policy,
        ..SigningConfig::default()
    };
    SigningSessionController::new(
        config,
        "signer@example.com",
        SignatureRequestId(7),
        vec![Vec::new(); count],
    )
    .unwrap()
}

#[derive(Debug, Clone)]
enum Interaction {
    Select(usize),
    Next,
    Prev,
    ScrollTo(f64),
    OpenModal,
    DismissModal,
}

fn interaction() -> impl Strategy<Value = Interaction> {
    prop_oneof![
        (0usize..6).prop_map(Interaction::Select),
        Just(Interaction::Next),
        Just(Interaction::Prev),
        (0.0f64..1300.0).prop_map(Interaction::ScrollTo),
        Just(Interaction::OpenModal),
        Just(Interaction::DismissModal),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn review_progress_is_monotone(steps in prop::collection::vec(interaction(), 0..80)) {
        let mut c = controller(4, NavigationPolicy::Strict);
        let mut read_before = 0;
        for step in steps {
            match step {
                Interaction::Select(i) => { c.select_document(i); }
                Interaction::Next => { c.next_document(); }
                Interaction::Prev => { c.prev_document(); }
                Interaction::ScrollTo(top) => {
                    let current = c.tracker().current_index();
                    c.on_scroll(current, top, 2000.0, 800.0);
                }
                Interaction::OpenModal => { let _ = c.open_signing_modal(); }
                Interaction::DismissModal => { c.dismiss_modal(); }
            }

            let read_now = c.progress().read;
            prop_assert!(read_now >= read_before);
            read_before = read_now;

            prop_assert!(c.tracker().current_index() < 4);
            prop_assert_eq!(c.state() != SessionState::Reviewing, c.tracker().all_read());

            let controls = c.controls();
            prop_assert_eq!(controls.sign_enabled, c.tracker().all_read());
            if !c.tracker().is_read(c.tracker().current_index()) {
                prop_assert!(!controls.next_enabled);
            }
        }
    }

    #[test]
    fn next_never_skips_an_unread_document(steps in prop::collection::vec(interaction(), 0..80)) {
        let mut c = controller(5, NavigationPolicy::Strict);
        for step in steps {
            let before = c.tracker().current_index();
            let before_read = c.tracker().is_read(before);
            let moved = match step {
                Interaction::Next => c.next_document(),
                Interaction::Select(i) => { c.select_document(i); false }
                Interaction::ScrollTo(top) => { c.on_scroll(before, top, 2000.0, 800.0); false }
                _ => false,
            };
            if moved {
                prop_assert!(before_read);
                prop_assert_eq!(c.tracker().current_index(), before + 1);
            }
        }
    }

    #[test]
    fn otp_never_has_two_requests_in_flight(
        ops in prop::collection::vec((0u8..4, any::<bool>()), 0..40)
    ) {
        let mut c = controller(1, NavigationPolicy::Strict);
        c.on_document_displayed(0, 100.0, 800.0);
        c.open_signing_modal().unwrap();
        c.set_otp_code("123456");

        let mut pending = None;
        for (op, ok) in ops {
            let outcome = if ok { Ok(()) } else { Err(TransportError::Rejected { status: 400 }) };
            match op {
                0 => {
                    if let Ok(req) = c.begin_send_otp() {
                        prop_assert!(pending.is_none());
                        pending = Some(req.ticket);
                    }
                }
                1 => {
                    if let Ok(req) = c.begin_verify_otp() {
                        prop_assert!(pending.is_none());
                        pending = Some(req.ticket);
                    }
                }
                2 => {
                    if let Some(ticket) = pending.take() {
                        c.complete_send_otp(ticket, outcome.clone());
                        c.complete_verify_otp(ticket, outcome);
                    }
                }
                _ => {
                    c.open_signing_modal().unwrap_or(());
                    c.set_otp_code("123456");
                    pending = None;
                }
            }
            let in_flight = matches!(c.otp_phase(), OtpPhase::Sending | OtpPhase::Verifying);
            prop_assert_eq!(in_flight, pending.is_some());
        }
    }
}
