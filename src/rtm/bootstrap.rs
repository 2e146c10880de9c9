//! RTM handshake over the Web API.
//!
//! Both modes are a single `execute` call; they differ in the method name
//! and in whether a state snapshot is decoded from the payload.

use reqwest::Url;
use serde::de::Error as _;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::rtm::proto::{RtmConnectResponse, RtmSnapshot, RtmStartResponse};
use crate::web_api::{ApiError, Params, TransportError, WebApiClient};

const RTM_START_METHOD: &str = "rtm.start";
const RTM_CONNECT_METHOD: &str = "rtm.connect";
const RTM_SOCKET_LABEL: &str = "rtm.socket";
const ENVELOPE_FIELDS: [&str; 2] = ["ok", "error"];

/// Raw websocket returned by [`RtmEndpoint::connect`].
pub type RtmSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Which bootstrap call to make.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RtmMode {
    /// `rtm.start`: endpoint plus a full workspace snapshot.
    Full,
    /// `rtm.connect`: endpoint only.
    #[default]
    Lightweight,
}

impl RtmMode {
    pub fn method(self) -> &'static str {
        match self {
            Self::Full => RTM_START_METHOD,
            Self::Lightweight => RTM_CONNECT_METHOD,
        }
    }
}

/// Single-use, short-lived websocket endpoint.
///
/// The URL embeds a one-time ticket, so connect promptly; the descriptor is
/// consumed by [`connect`](Self::connect).
#[derive(Clone, Debug, PartialEq)]
pub struct RtmEndpoint {
    url: Url,
    snapshot: Option<RtmSnapshot>,
}

impl RtmEndpoint {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Workspace snapshot; only present for [`RtmMode::Full`].
    pub fn snapshot(&self) -> Option<&RtmSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn into_parts(self) -> (Url, Option<RtmSnapshot>) {
        (self.url, self.snapshot)
    }

    /// Performs the websocket opening handshake against this endpoint.
    ///
    /// Reading and dispatching events is left to the caller.
    pub async fn connect(self, cancel: &CancellationToken) -> Result<RtmSocket, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::cancelled(RTM_SOCKET_LABEL));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(event = "rtm_connect_cancelled");
                Err(ApiError::cancelled(RTM_SOCKET_LABEL))
            }
            result = connect_async(self.url.as_str()) => {
                let (socket, _) = result.map_err(|err| {
                    ApiError::transport(RTM_SOCKET_LABEL, TransportError::WebSocket(err))
                })?;
                debug!(event = "rtm_socket_open", host = self.url.host_str().unwrap_or_default());
                Ok(socket)
            }
        }
    }
}

/// Exchanges the client's token for an RTM endpoint.
pub async fn bootstrap(
    api: &WebApiClient,
    cancel: &CancellationToken,
    mode: RtmMode,
) -> Result<RtmEndpoint, ApiError> {
    let method = mode.method();
    let params = Params::new();

    let (raw_url, snapshot) = match mode {
        RtmMode::Full => {
            let response: RtmStartResponse = api.execute(cancel, method, &params).await?;
            let mut snapshot = response.snapshot;
            for field in ENVELOPE_FIELDS {
                snapshot.state.remove(field);
            }
            (response.url, Some(snapshot))
        }
        RtmMode::Lightweight => {
            let response: RtmConnectResponse = api.execute(cancel, method, &params).await?;
            (response.url, None)
        }
    };

    let url = parse_socket_url(method, &raw_url, allows_plain_socket(api))?;
    debug!(
        event = "rtm_endpoint_issued",
        method,
        host = url.host_str().unwrap_or_default(),
        snapshot = snapshot.is_some()
    );

    Ok(RtmEndpoint { url, snapshot })
}

/// Plain `ws` is only accepted when the API itself is reached over plain
/// `http`, i.e. a local endpoint.
fn allows_plain_socket(api: &WebApiClient) -> bool {
    Url::parse(api.base_url()).is_ok_and(|base| base.scheme() == "http")
}

fn parse_socket_url(method: &str, raw: &str, allow_plain: bool) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|err| {
        ApiError::decode(
            method,
            serde_json::Error::custom(format!("invalid websocket url: {err}")),
            raw,
        )
    })?;

    match url.scheme() {
        "wss" => Ok(url),
        "ws" if allow_plain => Ok(url),
        scheme => Err(ApiError::decode(
            method,
            serde_json::Error::custom(format!("unexpected websocket scheme {scheme:?}")),
            raw,
        )),
    }
}
