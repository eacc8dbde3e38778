// DMS HTTP client
//
// Wraps `reqwest::Client` with DMS URL construction, bearer auth, and
// response classification. Endpoint methods live in `vp.rs` as inherent
// methods so this module stays focused on transport mechanics.

use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::bearer_headers;
use crate::dms::models::ErrorBody;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the DMS API.
///
/// All paths are resolved against `base_url` (e.g. `https://dms.example/`);
/// the `/dms/api/` prefix is part of each endpoint path.
#[derive(Debug, Clone)]
pub struct DmsClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl DmsClient {
    /// Build from a bearer token and transport config.
    ///
    /// Injects `Authorization` and `Accept` as default headers on every request.
    pub fn from_token(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = bearer_headers(token)?;
        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: TransportConfig::default().timeout_secs(),
        })
    }

    /// The DMS base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative endpoint path (e.g. `"dms/api/receive-vp/"`).
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.handle_response(resp).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        trace!(%status, len = body.len(), "response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized {
                message: error_message(&body).unwrap_or_else(|| "unauthorized".into()),
            });
        }

        if !status.is_success() {
            return Err(Error::ServerRejected {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        preview(&body).to_owned()
                    }
                }),
            });
        }

        if body.trim().is_empty() {
            return Err(Error::Deserialization {
                message: "empty response body".into(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

/// Pull a human-readable message out of an error body, if it is JSON.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.detail)
        .filter(|m| !m.trim().is_empty())
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client =
            DmsClient::from_reqwest("https://dms.example/root", reqwest::Client::new()).expect("url");
        assert_eq!(client.base_url().as_str(), "https://dms.example/root/");
        let joined = client.url("/dms/api/receive-vp/").expect("join");
        assert_eq!(joined.as_str(), "https://dms.example/root/dms/api/receive-vp/");
    }

    #[test]
    fn error_message_prefers_message_then_detail() {
        assert_eq!(
            error_message(r#"{"message":"Invalid OTP"}"#).as_deref(),
            Some("Invalid OTP")
        );
        assert_eq!(
            error_message(r#"{"detail":"Token expired"}"#).as_deref(),
            Some("Token expired")
        );
        assert_eq!(error_message(r#"{"message":""}"#), None);
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "অ".repeat(300);
        assert_eq!(preview(&body).chars().count(), 200);
    }
}
