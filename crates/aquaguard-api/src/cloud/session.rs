// Cloud session restored from the auth file written by the login flow.
//
// The QR-code login itself lives outside this crate. We only read the
// persisted result and refuse to build a session when any of the three
// keys the platform needs is missing.

use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Keys that must be present for a usable session.
pub const REQUIRED_AUTH_KEYS: [&str; 3] = ["ssecurity", "userId", "serviceToken"];

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(rename = "userId")]
    user_id: Option<serde_json::Value>,
    ssecurity: Option<String>,
    #[serde(rename = "serviceToken")]
    service_token: Option<String>,
}

/// Authenticated cloud session.
#[derive(Debug, Clone)]
pub struct CloudSession {
    user_id: String,
    ssecurity: SecretString,
    service_token: SecretString,
}

impl CloudSession {
    pub fn new(user_id: impl Into<String>, ssecurity: SecretString, service_token: SecretString) -> Self {
        Self {
            user_id: user_id.into(),
            ssecurity,
            service_token,
        }
    }

    /// Load a session from the JSON auth file.
    ///
    /// Returns `Error::NotAuthenticated` when the file exists but lacks a
    /// required key, and `Error::Session` when it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Session(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse a session from auth-file JSON.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let auth: AuthFile =
            serde_json::from_str(raw).map_err(|e| Error::Session(e.to_string()))?;

        // userId is numeric in some exports, a string in others
        let user_id = match auth.user_id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(Error::NotAuthenticated),
        };
        let (Some(ssecurity), Some(service_token)) = (auth.ssecurity, auth.service_token) else {
            return Err(Error::NotAuthenticated);
        };
        if ssecurity.is_empty() || service_token.is_empty() {
            return Err(Error::NotAuthenticated);
        }

        debug!(user_id = %user_id, "restored cloud session");
        Ok(Self::new(user_id, ssecurity.into(), service_token.into()))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn ssecurity(&self) -> &SecretString {
        &self.ssecurity
    }

    /// Default headers carrying the session cookie.
    pub(crate) fn headers(&self) -> Result<HeaderMap, Error> {
        let cookie = format!(
            "userId={}; serviceToken={}; yetAnotherServiceToken={}",
            self.user_id,
            self.service_token.expose_secret(),
            self.service_token.expose_secret(),
        );
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&cookie)
            .map_err(|e| Error::Session(format!("invalid session cookie: {e}")))?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::COOKIE, value);
        headers.insert(
            "x-xiaomi-protocal-flag-cli",
            HeaderValue::from_static("PROTOCAL-HTTP2"),
        );
        Ok(headers)
    }
}
