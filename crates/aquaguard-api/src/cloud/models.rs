// Cloud platform wire types.
//
// Every response is wrapped in `{code, message, result}`; `code == 0`
// means the call itself went through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "missing_code")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

fn missing_code() -> i64 {
    -1
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeviceListResult {
    #[serde(default)]
    pub list: Vec<CloudDevice>,
}

/// A device as reported by the bulk device-list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudDevice {
    pub did: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "isOnline", default = "online_by_default")]
    pub is_online: bool,
}

fn unknown_name() -> String {
    "Unknown device".into()
}

fn online_by_default() -> bool {
    true
}

/// Wire-level address of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyAddress {
    pub siid: u32,
    pub piid: u32,
}

impl PropertyAddress {
    pub const fn new(siid: u32, piid: u32) -> Self {
        Self { siid, piid }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PropGetParam<'a> {
    pub did: &'a str,
    pub siid: u32,
    pub piid: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct PropSetParam<'a> {
    pub did: &'a str,
    pub siid: u32,
    pub piid: u32,
    pub value: &'a Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct PropRequest<P: Serialize> {
    pub params: Vec<P>,
}

/// Per-property result entry of a get/set call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PropResult {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a property write as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub code: i64,
    pub message: String,
}

impl WriteOutcome {
    /// Success codes: `0`, or `1` paired with the platform's literal
    /// success message.
    pub fn is_success(&self) -> bool {
        self.code == 0 || (self.code == 1 && self.message == "成功")
    }
}
