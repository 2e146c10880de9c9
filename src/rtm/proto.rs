use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Connected user as reported in the RTM `self` object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SelfInfo {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Initial workspace state returned by `rtm.start`.
///
/// Only the identity parts are typed. Users, channels, groups, bots and the
/// rest stay as raw JSON for the event-stream consumer to interpret.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RtmSnapshot {
    #[serde(rename = "self")]
    pub self_info: SelfInfo,
    pub team: TeamInfo,
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

impl RtmSnapshot {
    /// Returns a raw state section such as `"users"` or `"channels"`.
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }
}

/// Wire shape of `rtm.start`.
#[derive(Debug, Deserialize)]
pub(crate) struct RtmStartResponse {
    pub url: String,
    #[serde(flatten)]
    pub snapshot: RtmSnapshot,
}

/// Wire shape of `rtm.connect`; identity fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct RtmConnectResponse {
    pub url: String,
}
