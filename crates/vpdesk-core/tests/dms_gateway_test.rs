#![allow(clippy::unwrap_used)]
// End-to-end: VpSession over DmsGateway over a wiremock DMS server.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vpdesk_core::{
    CoreError, DisplayOtpStatus, DmsGateway, GatewayConfig, SessionConfig, SessionPhase,
    TlsVerification, VpListQuery, VpSession,
};

const BARCODE: &str = "EV123BD";

// ── Helpers ─────────────────────────────────────────────────────────

fn gateway(server: &MockServer) -> DmsGateway {
    DmsGateway::connect(&GatewayConfig {
        url: Url::parse(&server.uri()).unwrap(),
        token: SecretString::from("counter-token".to_string()),
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn record(received: &str, otp: &str, paid: &str) -> serde_json::Value {
    json!({
        "id": 7,
        "article_barcode": BARCODE,
        "payable_amount": "1500.00",
        "commission": "30.00",
        "total_vp_cost": "1530.00",
        "received_status": received,
        "otp_status": otp,
        "otp_expired_at": null,
        "paid_status": paid,
        "sender_name": "Rahim",
        "booked_branch_code": "9999",
        "booked_branch_name": "Unknown Branch"
    })
}

async fn mount_info(server: &MockServer, data: serde_json::Value) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-information/"))
        .and(query_param("barcode", BARCODE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "status_code": 200,
            "message": "",
            "data": data
        })))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn open_converts_the_wire_record() {
    let server = MockServer::start().await;
    mount_info(&server, record("Pending", "pending", "Pending")).await;

    let session = VpSession::new(gateway(&server), SessionConfig::default());
    let record = tokio_test::assert_ok!(session.open(BARCODE).await);

    assert_eq!(record.barcode, BARCODE);
    assert_eq!(record.payable_amount.as_str(), "1500.00");
    assert_eq!(record.details.sender_name.as_deref(), Some("Rahim"));
    assert_eq!(record.details.booked_branch.code, None);
    assert_eq!(record.details.booked_branch.name, None);
    assert_eq!(session.snapshot().await.phase, SessionPhase::Pending);
    session.close().await;
}

#[tokio::test]
async fn unauthorized_receive_logs_fixed_text() {
    let server = MockServer::start().await;
    mount_info(&server, record("Pending", "pending", "Pending")).await;
    Mock::given(method("POST"))
        .and(path("/dms/api/receive-vp/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .mount(&server)
        .await;

    let session = VpSession::new(gateway(&server), SessionConfig::default());
    session.open(BARCODE).await.unwrap();
    let before = session.snapshot().await;

    let err = session.receive().await.unwrap_err();
    assert_eq!(
        err,
        CoreError::Unauthorized {
            message: "Token expired".into()
        }
    );

    let after = session.snapshot().await;
    assert_eq!(after.record, before.record);
    assert_eq!(after.messages.len(), before.messages.len() + 1);
    assert_eq!(after.messages.last().unwrap().text, "Error receiving VP Money");
    session.close().await;
}

#[tokio::test]
async fn send_otp_then_refetch_uses_server_expiry() {
    let server = MockServer::start().await;
    mount_info(&server, record("Received", "pending", "Pending")).await;

    let session = VpSession::new(gateway(&server), SessionConfig::default());
    session.open(BARCODE).await.unwrap();
    assert!(session.snapshot().await.gate.can_send_otp);

    // From here on the server reports the OTP as issued, far in the future.
    let mut issued = record("Received", "sent_success", "Pending");
    issued["otp_expired_at"] = json!("2999-01-01T00:00:00Z");
    mount_info(&server, issued).await;
    Mock::given(method("POST"))
        .and(path("/dms/api/send-payment-otp/"))
        .and(body_json(json!({ "barcode": BARCODE })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "OTP sent to user phone number.",
            "status_code": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = session.send_otp().await.unwrap();
    assert_eq!(receipt.display_message(), "OTP sent to user phone number.");

    let snap = session.snapshot().await;
    assert_eq!(snap.phase, SessionPhase::OtpIssued);
    assert_eq!(snap.view.unwrap().display_otp_status, DisplayOtpStatus::SentSuccess);
    assert!(snap.view.unwrap().effective_expires_at.is_some());
    assert!(!snap.overlay.otp_just_sent);
    assert!(snap.gate.can_pay_with_otp);
    session.close().await;
}

#[tokio::test]
async fn unreadable_status_is_malformed() {
    let server = MockServer::start().await;
    mount_info(&server, record("Pending", "bounced", "Pending")).await;

    let session = VpSession::new(gateway(&server), SessionConfig::default());
    let err = tokio_test::assert_err!(session.open(BARCODE).await);
    assert!(matches!(err, CoreError::MalformedResponse { .. }), "{err:?}");
    assert_eq!(
        session.snapshot().await.messages.last().unwrap().text,
        "Error loading VP information"
    );
    session.close().await;
}

#[tokio::test]
async fn list_skips_unreadable_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-info-list/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": "success",
            "status_code": 200,
            "message": "",
            "current_page": 1,
            "total_pages": 1,
            "total_records": 2,
            "page_size": 10,
            "previous_page": null,
            "data": [
                record("Received", "verified", "Paid"),
                record("Received", "mystery", "Pending")
            ]
        })))
        .mount(&server)
        .await;

    let page = gateway(&server).list(&VpListQuery::default()).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.skipped, 1);
    assert_eq!(page.total_records, 2);
    assert!(page.records[0].is_paid());
}
