// ── Gateway ──
//
// The session talks to the server only through `VpGateway`. `DmsGateway`
// is the HTTP implementation over `vpdesk_api::DmsClient`; tests swap in
// scripted fakes.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use vpdesk_api::transport::{TlsMode, TransportConfig};
use vpdesk_api::{ActionResponse, DmsClient, VpListQuery};

use crate::command::{ActionReceipt, CommandKind, Otp};
use crate::config::{GatewayConfig, TlsVerification};
use crate::convert::parse_timestamp;
use crate::error::CoreError;
use crate::model::VpRecord;

/// Server operations a VP session depends on. One request per call; the
/// caller owns retries.
pub trait VpGateway: Send + Sync + 'static {
    fn fetch_info(&self, barcode: &str) -> impl Future<Output = Result<VpRecord, CoreError>> + Send;

    fn receive(&self, barcode: &str)
    -> impl Future<Output = Result<ActionReceipt, CoreError>> + Send;

    fn send_otp(&self, barcode: &str)
    -> impl Future<Output = Result<ActionReceipt, CoreError>> + Send;

    fn pay_with_otp(
        &self,
        barcode: &str,
        otp: &Otp,
    ) -> impl Future<Output = Result<ActionReceipt, CoreError>> + Send;
}

// ── DMS over HTTP ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DmsGateway {
    client: DmsClient,
}

impl DmsGateway {
    pub fn new(client: DmsClient) -> Self {
        Self { client }
    }

    /// Build the HTTP client described by `config`.
    pub fn connect(config: &GatewayConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let client = DmsClient::from_token(config.url.as_str(), &config.token, &transport)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &DmsClient {
        &self.client
    }

    /// One page of VP records, for browsing outside a session.
    ///
    /// Rows that fail conversion are skipped and counted.
    pub async fn list(&self, query: &VpListQuery) -> Result<VpPage, CoreError> {
        let resp = self.client.list_vp(query).await?;
        let mut skipped = 0_usize;
        let records = resp
            .data
            .into_iter()
            .filter_map(|wire| match VpRecord::try_from(wire) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable VP row");
                    skipped += 1;
                    None
                }
            })
            .collect();

        Ok(VpPage {
            current_page: resp.current_page,
            total_pages: resp.total_pages,
            total_records: resp.total_records,
            page_size: resp.page_size,
            skipped,
            records,
        })
    }
}

impl VpGateway for DmsGateway {
    async fn fetch_info(&self, barcode: &str) -> Result<VpRecord, CoreError> {
        let wire = self.client.fetch_vp_info(barcode).await?;
        VpRecord::try_from(wire)
    }

    async fn receive(&self, barcode: &str) -> Result<ActionReceipt, CoreError> {
        let resp = self.client.receive_vp(barcode).await?;
        Ok(receipt(CommandKind::Receive, resp))
    }

    async fn send_otp(&self, barcode: &str) -> Result<ActionReceipt, CoreError> {
        let resp = self.client.send_payment_otp(barcode).await?;
        Ok(receipt(CommandKind::SendOtp, resp))
    }

    async fn pay_with_otp(&self, barcode: &str, otp: &Otp) -> Result<ActionReceipt, CoreError> {
        let resp = self.client.pay_with_otp(barcode, otp.as_str()).await?;
        Ok(receipt(CommandKind::PayWithOtp, resp))
    }
}

/// A page of converted VP records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpPage {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub page_size: u32,
    /// Rows dropped because they could not be converted.
    pub skipped: usize,
    pub records: Vec<VpRecord>,
}

fn receipt(kind: CommandKind, resp: ActionResponse) -> ActionReceipt {
    let otp_expires_at = resp.otp_expired_at.as_deref().and_then(parse_timestamp);
    ActionReceipt {
        kind,
        message: resp.message,
        status_code: resp.status_code,
        otp_expires_at,
        otp_ttl: resp.otp_ttl.map(Duration::from_secs),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_carries_otp_hints() {
        let resp = ActionResponse {
            status: "success".into(),
            message: "OTP sent".into(),
            status_code: 200,
            otp_expired_at: Some("2025-01-01T00:05:00Z".into()),
            otp_ttl: Some(300),
        };
        let r = receipt(CommandKind::SendOtp, resp);
        assert_eq!(r.kind, CommandKind::SendOtp);
        assert_eq!(r.otp_ttl, Some(Duration::from_secs(300)));
        assert_eq!(
            r.otp_expires_at.map(|t| t.to_rfc3339()),
            Some("2025-01-01T00:05:00+00:00".to_owned())
        );
    }

    #[test]
    fn tls_modes_map_one_to_one() {
        assert!(matches!(
            tls_to_transport(&TlsVerification::SystemDefaults),
            TlsMode::System
        ));
        assert!(matches!(
            tls_to_transport(&TlsVerification::DangerAcceptInvalid),
            TlsMode::DangerAcceptInvalid
        ));
    }
}
