// Push notification HTTP client (PushPlus-compatible).
//
// One `POST /send` per message. The service answers HTTP 200 even for
// rejected messages; the JSON `code` field carries the verdict.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default service root.
pub const DEFAULT_PUSH_BASE_URL: &str = "http://www.pushplus.plus";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    token: &'a str,
    title: &'a str,
    content: &'a str,
    template: &'a str,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    code: i64,
    #[serde(default, rename = "msg")]
    message: Option<String>,
}

/// Client for the push notification service.
#[derive(Debug, Clone)]
pub struct PushClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PushClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Send one plain-text message. An empty `content` falls back to the
    /// title. Returns `Ok(true)` iff the service accepted the message.
    pub async fn send(&self, token: &SecretString, title: &str, content: &str) -> Result<bool, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/send"))?;
        let body = PushRequest {
            token: token.expose_secret(),
            title,
            content: if content.is_empty() { title } else { content },
            template: "txt",
        };

        debug!(title, "POST {}", url);
        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let parsed: PushResponse = serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.clone(),
        })?;
        if parsed.code != 200 {
            warn!(
                code = parsed.code,
                message = parsed.message.as_deref().unwrap_or(""),
                "push rejected"
            );
        }
        Ok(parsed.code == 200)
    }
}
