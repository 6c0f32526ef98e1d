// Cloud platform HTTP client
//
// JSON-over-POST against the smart-home platform's app API. The session
// cookie is baked into the client's default headers at construction, so
// a `CloudClient` only exists for a logged-in session.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::cloud::models::{
    CloudDevice, DeviceListResult, Envelope, PropGetParam, PropRequest, PropResult,
    PropSetParam, PropertyAddress, WriteOutcome,
};
use crate::cloud::session::CloudSession;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Default app API root.
pub const DEFAULT_CLOUD_BASE_URL: &str = "https://api.io.mi.com/app";

/// Client for the cloud smart-home platform.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    user_id: String,
}

impl CloudClient {
    /// Build a client for an established session.
    pub fn new(base_url: Url, session: &CloudSession, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client_with_headers(session.headers()?)?;
        Ok(Self::with_client(http, base_url, session.user_id()))
    }

    /// Build a client with a pre-configured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, user_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            user_id: user_id.into(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every device bound to the account, with its reachability.
    ///
    /// This is the single-round-trip bulk call the poller uses for its
    /// reachability pass.
    pub async fn list_devices(&self) -> Result<Vec<CloudDevice>, Error> {
        let body = serde_json::json!({
            "getVirtualModel": true,
            "getHuamiDevices": 1,
            "get_split_device": false,
            "support_smart_home": true,
        });
        let result: DeviceListResult = self.post("home/device_list", &body).await?;
        debug!(count = result.list.len(), "cloud device list");
        Ok(result.list)
    }

    /// Read one property. Returns `Value::Null` when the platform answers
    /// without a value.
    pub async fn read_property(&self, did: &str, address: PropertyAddress) -> Result<Value, Error> {
        let request = PropRequest {
            params: vec![PropGetParam {
                did,
                siid: address.siid,
                piid: address.piid,
            }],
        };
        let results: Vec<PropResult> = self.post("miotspec/prop/get", &request).await?;
        let entry = results.into_iter().next().ok_or_else(|| Error::Cloud {
            code: -1,
            message: "empty property result".into(),
        })?;

        if entry.code != 0 {
            return Err(Error::Cloud {
                code: entry.code,
                message: entry.message.unwrap_or_default(),
            });
        }
        trace!(did, siid = address.siid, piid = address.piid, "read property");
        Ok(entry.value.unwrap_or(Value::Null))
    }

    /// Write one property and return the platform's verdict.
    pub async fn write_property(
        &self,
        did: &str,
        address: PropertyAddress,
        value: &Value,
    ) -> Result<WriteOutcome, Error> {
        let request = PropRequest {
            params: vec![PropSetParam {
                did,
                siid: address.siid,
                piid: address.piid,
                value,
            }],
        };
        let url = self.url("miotspec/prop/set")?;
        debug!(did, siid = address.siid, piid = address.piid, %value, "POST {}", url);
        let envelope: Envelope<Vec<PropResult>> = self.send(url, &request).await?;

        let entry = envelope.result.and_then(|r| r.into_iter().next());
        let outcome = match entry {
            Some(e) => WriteOutcome {
                code: e.code,
                message: e.message.unwrap_or(envelope.message),
            },
            None => WriteOutcome {
                code: envelope.code,
                message: envelope.message,
            },
        };
        Ok(outcome)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST and unwrap the `{code, message, result}` envelope.
    async fn post<T: DeserializeOwned>(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let envelope: Envelope<T> = self.send(url, body).await?;
        if envelope.code != 0 {
            return Err(Error::Cloud {
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope.result.ok_or_else(|| Error::Cloud {
            code: envelope.code,
            message: "response carried no result".into(),
        })
    }

    async fn send<T: DeserializeOwned>(&self, url: Url, body: &(impl Serialize + Sync)) -> Result<Envelope<T>, Error> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::NotAuthenticated);
        }
        let text = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text,
        })
    }
}
