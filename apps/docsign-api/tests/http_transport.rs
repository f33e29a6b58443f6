//! Drives the signing controller over real HTTP against the development server

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use docsign_api::{router, AppState};
use docsign_core::{
    HttpTransport, OtpPhase, Point, SessionState, SignatureRequestId, SigningConfig, SigningFlow,
    SigningSessionController,
};

async fn spawn_server() -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::new(Duration::minutes(30)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

fn reviewed_session(config: SigningConfig) -> SigningSessionController {
    let mut controller = SigningSessionController::new(
        config,
        "a@b.com",
        SignatureRequestId(42),
        vec![vec!["/static/1_nda/page_1.png".to_string()]],
    )
    .unwrap();
    controller.on_document_displayed(0, 600.0, 800.0);
    controller.open_signing_modal().unwrap();
    controller
}

#[tokio::test]
async fn signs_over_http() {
    let (state, addr) = spawn_server().await;
    let config = SigningConfig {
        base_url: format!("http://{}", addr),
        ..SigningConfig::default()
    };
    let transport = HttpTransport::new(&config);
    let flow = SigningFlow::new(reviewed_session(config), transport);

    assert_eq!(flow.send_otp().await.unwrap(), Some(OtpPhase::Sent));

    flow.controller_mut().set_otp_code("not-a-code");
    assert_eq!(flow.verify_otp().await.unwrap(), Some(OtpPhase::Sent));

    {
        let mut controller = flow.controller_mut();
        controller.begin_stroke(Point::new(30.0, 120.0));
        controller.extend_stroke(Point::new(200.0, 80.0));
        controller.end_stroke();
        controller.save_signature().unwrap();
    }

    let code = state.issued_code("a@b.com").unwrap();
    flow.controller_mut().set_otp_code(code);
    assert_eq!(flow.submit_otp().await.unwrap(), SessionState::Signed);

    assert!(state.signature("a@b.com", SignatureRequestId(42)).is_some());
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    // Bind and drop a listener to get a port nobody is serving
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SigningConfig {
        base_url: format!("http://{}", addr),
        ..SigningConfig::default()
    };
    let transport = HttpTransport::new(&config);
    let flow = SigningFlow::new(reviewed_session(config), transport);

    assert_eq!(flow.send_otp().await.unwrap(), Some(OtpPhase::Failed));
    assert!(flow.controller().otp_controls().send_enabled);
}
