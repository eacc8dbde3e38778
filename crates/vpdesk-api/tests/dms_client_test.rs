#![allow(clippy::unwrap_used)]
// Integration tests for `DmsClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vpdesk_api::{DmsClient, Error, TransportConfig, VpListQuery};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DmsClient) {
    let server = MockServer::start().await;
    let token = SecretString::from("counter-token".to_string());
    let client = DmsClient::from_token(&server.uri(), &token, &TransportConfig::default()).unwrap();
    (server, client)
}

fn vp_record(barcode: &str) -> serde_json::Value {
    json!({
        "id": 41,
        "booking_id": "BK-2025-0001",
        "form_number": "F-77",
        "commission": "30.00",
        "payable_amount": "1500.00",
        "total_vp_cost": "1530.00",
        "otp_verified_at": null,
        "otp_expired_at": "2025-01-01T00:05:00Z",
        "received_status": "Received",
        "paid_status": "Pending",
        "otp_status": "sent_success",
        "article_barcode": barcode,
        "article_service_type": "parcel",
        "article_service_type_name": "parcel",
        "booked_branch_code": "1000",
        "booked_branch_name": "Dhaka GPO",
        "sender_name": "Rahim",
        "sender_phone": "01700000000"
    })
}

// ── Fetch VP info ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_vp_info_success() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-information/"))
        .and(query_param("barcode", "EV123BD"))
        .and(header("authorization", "Bearer counter-token"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "status_code": 200,
            "message": "",
            "data": vp_record("EV123BD")
        })))
        .mount(&server)
        .await;

    let record = client.fetch_vp_info("EV123BD").await.unwrap();

    assert_eq!(record.article_barcode, "EV123BD");
    assert_eq!(record.otp_status, "sent_success");
    assert_eq!(record.otp_expired_at, "2025-01-01T00:05:00Z");
    assert_eq!(record.otp_verified_at, "");
    assert_eq!(record.payable_amount, "1500.00");
}

#[tokio::test]
async fn test_fetch_vp_info_null_data_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-information/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": "success",
            "status_code": 200,
            "message": "",
            "data": null
        })))
        .mount(&server)
        .await;

    let result = client.fetch_vp_info("MISSING").await;
    assert!(
        matches!(result, Err(Error::NotFound { ref barcode }) if barcode == "MISSING"),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_fetch_vp_info_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-information/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
        )
        .mount(&server)
        .await;

    let result = client.fetch_vp_info("EV123BD").await;
    match result {
        Err(Error::Unauthorized { message }) => assert_eq!(message, "Token expired"),
        other => panic!("expected Unauthorized, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_vp_info_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-information/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.fetch_vp_info("EV123BD").await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization, got: {result:?}"
    );
}

#[tokio::test]
async fn test_empty_body_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/receive-vp/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client.receive_vp("EV123BD").await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization, got: {result:?}"
    );
}

// ── Actions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_receive_vp_posts_barcode() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/receive-vp/"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "barcode": "EV123BD" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "VP amount received",
            "status_code": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.receive_vp("EV123BD").await.unwrap();
    assert_eq!(resp.message, "VP amount received");
    assert_eq!(resp.status_code, 200);
}

#[tokio::test]
async fn test_send_payment_otp_surfaces_ttl() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/send-payment-otp/"))
        .and(body_json(json!({ "barcode": "EV123BD" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "OTP sent to user phone number.",
            "status_code": 200,
            "otp_ttl": 300
        })))
        .mount(&server)
        .await;

    let resp = client.send_payment_otp("EV123BD").await.unwrap();
    assert_eq!(resp.message, "OTP sent to user phone number.");
    assert_eq!(resp.otp_ttl, Some(300));
    assert_eq!(resp.otp_expired_at, None);
}

#[tokio::test]
async fn test_pay_with_otp_posts_otp() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/pay-with-otp/"))
        .and(body_json(json!({ "barcode": "EV123BD", "otp": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "VP money paid",
            "status_code": 200
        })))
        .mount(&server)
        .await;

    let resp = client.pay_with_otp("EV123BD", "123456").await.unwrap();
    assert_eq!(resp.message, "VP money paid");
}

#[tokio::test]
async fn test_action_rejected_with_json_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/pay-with-otp/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "Invalid OTP",
            "status_code": 400
        })))
        .mount(&server)
        .await;

    let result = client.pay_with_otp("EV123BD", "000000").await;
    match result {
        Err(Error::ServerRejected { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid OTP");
        }
        other => panic!("expected ServerRejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_action_failure_envelope_with_http_200() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/send-payment-otp/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "SMS gateway unavailable",
            "status_code": 4000
        })))
        .mount(&server)
        .await;

    let result = client.send_payment_otp("EV123BD").await;
    match result {
        Err(Error::ServerRejected { status, message }) => {
            assert_eq!(status, 4000);
            assert_eq!(message, "SMS gateway unavailable");
        }
        other => panic!("expected ServerRejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_action_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dms/api/receive-vp/"))
        .respond_with(ResponseTemplate::new(401).set_body_string(""))
        .mount(&server)
        .await;

    let result = client.receive_vp("EV123BD").await;
    assert!(
        matches!(result, Err(ref e) if e.is_auth_expired()),
        "expected Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    // Bind then drop a server so the port is closed.
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let token = SecretString::from("t".to_string());
    let client = DmsClient::from_token(&uri, &token, &TransportConfig::default()).unwrap();
    let result = client.receive_vp("EV123BD").await;
    assert!(
        matches!(result, Err(ref e) if e.is_transport()),
        "expected transport error, got: {result:?}"
    );
}

// ── List ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_vp_with_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dms/api/get-vp-info-list/"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "25"))
        .and(query_param("received_status", "Received"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": "success",
            "status_code": 200,
            "message": "",
            "current_page": 2,
            "total_pages": 3,
            "total_records": 51,
            "page_size": 25,
            "previous_page": 1,
            "data": [vp_record("EV1BD"), vp_record("EV2BD")]
        })))
        .mount(&server)
        .await;

    let query = VpListQuery {
        page: 2,
        page_size: 25,
        received_status: Some("Received".into()),
        paid_status: Some("all".into()),
        ..VpListQuery::default()
    };
    let page = client.list_vp(&query).await.unwrap();

    assert_eq!(page.current_page, 2);
    assert_eq!(page.total_records, 51);
    assert_eq!(page.previous_page, Some(1));
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[1].article_barcode, "EV2BD");

    let requests = server.received_requests().await.unwrap();
    let query_string = requests[0].url.query().unwrap_or_default().to_owned();
    assert!(
        !query_string.contains("paid_status"),
        "'all' filter should be omitted: {query_string}"
    );
}
