// Wire types for the DMS VP endpoints.
//
// Field names follow the server's snake_case JSON. Every string field
// tolerates `null` or absence: the server fills unknown values
// inconsistently, so nothing here is required except what the envelope
// needs to be recognizable.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a string that may be `null`, missing, or a bare number.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// One VP record as returned by both the info and list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpRecordWire {
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub booking_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub form_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub commission: String,
    #[serde(deserialize_with = "lenient_string")]
    pub payable_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_vp_cost: String,
    #[serde(deserialize_with = "lenient_string")]
    pub otp_verified_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub otp_expired_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub received_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub received_by_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub received_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub paid_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub otp_status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub paid_by_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub paid_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_by_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub article_barcode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub article_service_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub article_service_type_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub article_event_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub booked_branch_code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub booked_branch_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub booked_branch_bn_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub delivery_branch_code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub delivery_branch_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub delivery_branch_bn_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sender_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sender_phone: String,
}

/// `GET /dms/api/get-vp-information/` envelope.
///
/// Older deployments report the outcome as `success`, newer ones as
/// `status`; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct VpInfoResponse {
    #[serde(default, alias = "success")]
    pub status: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default)]
    pub data: Option<VpRecordWire>,
}

/// `GET /dms/api/get-vp-info-list/` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpListResponse {
    #[serde(default, alias = "success")]
    pub status: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub previous_page: Option<u32>,
    #[serde(default)]
    pub data: Vec<VpRecordWire>,
}

/// Envelope returned by the three POST actions.
///
/// `otp_expired_at` / `otp_ttl` are only present on `send-payment-otp`
/// responses from servers that expose the OTP lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expired_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_ttl: Option<u64>,
}

impl ActionResponse {
    /// Whether the envelope itself reports failure despite a 2xx status.
    pub fn is_failure(&self) -> bool {
        let status = self.status.to_ascii_lowercase();
        status == "error" || status == "failed" || status == "failure" || self.status_code >= 400
    }
}

/// Error body shape for non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

// ── Request bodies ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct BarcodeBody<'a> {
    pub barcode: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PayWithOtpBody<'a> {
    pub barcode: &'a str,
    pub otp: &'a str,
}

// ── List query ──────────────────────────────────────────────────────

/// Filters for the VP list endpoint.
///
/// Status and service-type filters set to `"all"` are treated as unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpListQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    /// `dd-mm-yyyy HH:MM:SS`, passed through verbatim.
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub paid_status: Option<String>,
    pub received_status: Option<String>,
    pub otp_status: Option<String>,
    pub service_type: Option<String>,
}

impl Default for VpListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            from_date: None,
            to_date: None,
            paid_status: None,
            received_status: None,
            otp_status: None,
            service_type: None,
        }
    }
}

impl VpListQuery {
    /// Render as query parameters in the order the server documents them.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        fn set(value: Option<&String>) -> Option<String> {
            value.filter(|v| !v.is_empty()).cloned()
        }
        fn filter(value: Option<&String>) -> Option<String> {
            value
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
                .cloned()
        }

        let mut params = Vec::new();
        if let Some(v) = set(self.from_date.as_ref()) {
            params.push(("from_date", v));
        }
        if let Some(v) = set(self.to_date.as_ref()) {
            params.push(("to_date", v));
        }
        params.push(("page", self.page.to_string()));
        params.push(("page_size", self.page_size.to_string()));
        if let Some(v) = set(self.search.as_ref()) {
            params.push(("search", v));
        }
        if let Some(v) = filter(self.paid_status.as_ref()) {
            params.push(("paid_status", v));
        }
        if let Some(v) = filter(self.received_status.as_ref()) {
            params.push(("received_status", v));
        }
        if let Some(v) = filter(self.otp_status.as_ref()) {
            params.push(("otp_status", v));
        }
        if let Some(v) = filter(self.service_type.as_ref()) {
            params.push(("service_type", v));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tolerates_nulls_and_numbers() {
        let raw = serde_json::json!({
            "id": 7,
            "article_barcode": "EV123456789BD",
            "payable_amount": 1500.5,
            "commission": null,
            "otp_expired_at": null
        });
        let record: VpRecordWire = serde_json::from_value(raw).expect("lenient record");
        assert_eq!(record.article_barcode, "EV123456789BD");
        assert_eq!(record.payable_amount, "1500.5");
        assert_eq!(record.commission, "");
        assert_eq!(record.otp_expired_at, "");
        assert_eq!(record.sender_name, "");
    }

    #[test]
    fn info_envelope_accepts_success_alias() {
        let raw = r#"{"success":"success","status_code":200,"message":"","data":null}"#;
        let resp: VpInfoResponse = serde_json::from_str(raw).expect("envelope");
        assert_eq!(resp.status.as_deref(), Some("success"));
        assert!(resp.data.is_none());
    }

    #[test]
    fn action_failure_detection() {
        let ok = ActionResponse {
            status: "success".into(),
            status_code: 200,
            ..ActionResponse::default()
        };
        assert!(!ok.is_failure());

        let err = ActionResponse {
            status: "Error".into(),
            status_code: 200,
            ..ActionResponse::default()
        };
        assert!(err.is_failure());

        let coded = ActionResponse {
            status: "success".into(),
            status_code: 4000,
            ..ActionResponse::default()
        };
        assert!(coded.is_failure());
    }

    #[test]
    fn list_query_skips_all_filters() {
        let query = VpListQuery {
            search: Some("EV1".into()),
            paid_status: Some("all".into()),
            otp_status: Some("verified".into()),
            service_type: Some(String::new()),
            ..VpListQuery::default()
        };
        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("page", "1".to_string()),
                ("page_size", "10".to_string()),
                ("search", "EV1".to_string()),
                ("otp_status", "verified".to_string()),
            ]
        );
    }
}
