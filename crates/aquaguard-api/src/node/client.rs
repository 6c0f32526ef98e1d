// HTTP node client
//
// Wraps `reqwest::Client` with node URL normalization and JSON decoding.
// The sensor and light endpoints are implemented on top of this in
// separate files to keep this module focused on transport mechanics.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for one ESP node.
///
/// The node address may be a bare `host[:port]` or a full URL; bare
/// addresses are served over plain `http://`.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl NodeClient {
    /// Create a client for the node at `address`.
    pub fn new(address: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, node_base_url(address)?))
    }

    /// Create a node client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The normalized node base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Send a GET request and return the raw response.
    pub(crate) async fn get_raw(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        self.http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(Error::Transport)
    }

    /// Send a GET request and decode a JSON body, failing on non-2xx.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let resp = self.get_raw(path, query).await?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// Normalize a node address into a base URL.
pub fn node_base_url(address: &str) -> Result<Url, Error> {
    let address = address.trim();
    if address.starts_with("http") {
        Ok(Url::parse(address)?)
    } else {
        Ok(Url::parse(&format!("http://{address}"))?)
    }
}
