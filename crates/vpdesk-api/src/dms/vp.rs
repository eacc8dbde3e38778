// DMS Value-Payable endpoints
//
// One request per call, no retries. The caller owns retry policy.

use tracing::debug;

use crate::dms::client::DmsClient;
use crate::dms::models::{
    ActionResponse, BarcodeBody, PayWithOtpBody, VpInfoResponse, VpListQuery, VpListResponse,
    VpRecordWire,
};
use crate::error::Error;

const VP_INFO_PATH: &str = "dms/api/get-vp-information/";
const VP_LIST_PATH: &str = "dms/api/get-vp-info-list/";
const RECEIVE_VP_PATH: &str = "dms/api/receive-vp/";
const SEND_OTP_PATH: &str = "dms/api/send-payment-otp/";
const PAY_WITH_OTP_PATH: &str = "dms/api/pay-with-otp/";

impl DmsClient {
    /// Fetch the VP record for one barcode.
    ///
    /// `GET /dms/api/get-vp-information/?barcode=…`
    pub async fn fetch_vp_info(&self, barcode: &str) -> Result<VpRecordWire, Error> {
        debug!(barcode, "fetching VP information");
        let resp: VpInfoResponse = self
            .get(VP_INFO_PATH, &[("barcode", barcode.to_owned())])
            .await?;

        resp.data.ok_or_else(|| Error::NotFound {
            barcode: barcode.to_owned(),
        })
    }

    /// List VP records with pagination and filters.
    ///
    /// `GET /dms/api/get-vp-info-list/`
    pub async fn list_vp(&self, query: &VpListQuery) -> Result<VpListResponse, Error> {
        debug!(page = query.page, page_size = query.page_size, "listing VP records");
        self.get(VP_LIST_PATH, &query.to_params()).await
    }

    /// Mark the VP amount as received at the counter.
    ///
    /// `POST /dms/api/receive-vp/`
    pub async fn receive_vp(&self, barcode: &str) -> Result<ActionResponse, Error> {
        debug!(barcode, "receiving VP money");
        let resp = self.post(RECEIVE_VP_PATH, &BarcodeBody { barcode }).await?;
        check_action(resp)
    }

    /// Ask the server to issue a payment OTP to the sender.
    ///
    /// `POST /dms/api/send-payment-otp/`
    pub async fn send_payment_otp(&self, barcode: &str) -> Result<ActionResponse, Error> {
        debug!(barcode, "sending payment OTP");
        let resp = self.post(SEND_OTP_PATH, &BarcodeBody { barcode }).await?;
        check_action(resp)
    }

    /// Verify the OTP and pay out the VP amount.
    ///
    /// `POST /dms/api/pay-with-otp/`
    pub async fn pay_with_otp(&self, barcode: &str, otp: &str) -> Result<ActionResponse, Error> {
        debug!(barcode, "paying VP money with OTP");
        let resp = self
            .post(PAY_WITH_OTP_PATH, &PayWithOtpBody { barcode, otp })
            .await?;
        check_action(resp)
    }
}

/// A 2xx envelope can still report failure in its `status` / `status_code`.
fn check_action(resp: ActionResponse) -> Result<ActionResponse, Error> {
    if resp.is_failure() {
        return Err(Error::ServerRejected {
            status: resp.status_code,
            message: resp.message,
        });
    }
    Ok(resp)
}
