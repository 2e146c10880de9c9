use reqwest::StatusCode;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

const ERROR_BODY_SNIPPET_LEN: usize = 220;

/// Success/error wrapper present at the top level of every response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Returns the remote error code for a failed envelope.
    ///
    /// `None` for successful envelopes, whatever their `error` field holds.
    pub fn failure_code(&self) -> Option<&str> {
        if self.ok {
            return None;
        }
        self.error.as_deref().filter(|code| !code.is_empty())
    }
}

/// Coarse classification of [`ApiError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidMethod,
    Transport,
    Decode,
    Application,
    Cancelled,
}

/// Network-level failure, unrelated to caller cancellation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request send failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("response read failed: {0}")]
    ResponseRead(#[source] reqwest::Error),

    #[error("http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("websocket handshake failed: {0}")]
    WebSocket(#[source] WsError),
}

/// Error returned by every Web API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The method name was empty or malformed; nothing was sent.
    #[error("invalid api method name {0:?}")]
    InvalidMethod(String),

    #[error("{method} transport error: {source}")]
    Transport {
        method: String,
        #[source]
        source: TransportError,
    },

    #[error("{method} response decode failed: {source}. body={body}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The envelope reported `ok=false`; displays the remote code verbatim.
    #[error("{code}")]
    Application { method: String, code: String },

    #[error("{method} cancelled")]
    Cancelled { method: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMethod(_) => ErrorKind::InvalidMethod,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Application { .. } => ErrorKind::Application,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Remote error code such as `invalid_auth`, for application errors.
    pub fn application_code(&self) -> Option<&str> {
        match self {
            Self::Application { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn transport(method: &str, source: TransportError) -> Self {
        Self::Transport {
            method: method.to_string(),
            source,
        }
    }

    pub(crate) fn cancelled(method: &str) -> Self {
        Self::Cancelled {
            method: method.to_string(),
        }
    }

    pub(crate) fn decode(method: &str, source: serde_json::Error, body: &str) -> Self {
        Self::Decode {
            method: method.to_string(),
            source,
            body: summarize_body(body),
        }
    }
}

/// Decodes a response body into `T` after checking the envelope.
///
/// The envelope is decoded first; a failed envelope stops here with an
/// application error even when the remaining fields would not match `T`.
pub(crate) fn decode_response<T>(method: &str, body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let document = parse_document(method, body)?;
    check_envelope(method, body, &document)?;
    T::deserialize(Value::Object(document)).map_err(|err| ApiError::decode(method, err, body))
}

/// Returns the remote failure when `body` is a well-formed failed envelope.
pub(crate) fn failed_envelope(method: &str, body: &str) -> Option<ApiError> {
    let document = serde_json::from_str::<Map<String, Value>>(body).ok()?;
    match check_envelope(method, body, &document) {
        Err(err @ ApiError::Application { .. }) => Some(err),
        _ => None,
    }
}

fn parse_document(method: &str, body: &str) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(ApiError::decode(
            method,
            serde_json::Error::custom("response body is not a json object"),
            body,
        )),
        Err(err) => Err(ApiError::decode(method, err, body)),
    }
}

fn check_envelope(method: &str, body: &str, document: &Map<String, Value>) -> Result<(), ApiError> {
    let envelope = ResponseEnvelope {
        ok: match document.get("ok") {
            Some(Value::Bool(ok)) => *ok,
            Some(_) => {
                return Err(ApiError::decode(
                    method,
                    serde_json::Error::custom("envelope field `ok` is not a boolean"),
                    body,
                ))
            }
            None => {
                return Err(ApiError::decode(
                    method,
                    serde_json::Error::missing_field("ok"),
                    body,
                ))
            }
        },
        error: document
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    if envelope.ok {
        return Ok(());
    }

    match envelope.failure_code() {
        Some(code) => Err(ApiError::Application {
            method: method.to_string(),
            code: code.to_string(),
        }),
        None => Err(ApiError::decode(
            method,
            serde_json::Error::custom("envelope has ok=false without an error code"),
            body,
        )),
    }
}

pub(crate) fn summarize_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::{Map, Value};

    use super::{decode_response, failed_envelope, ApiError, ErrorKind, ResponseEnvelope};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Presence {
        presence: String,
        online: bool,
    }

    #[test]
    fn ok_envelope_merges_flat_payload() {
        let body = r#"{"ok":true,"presence":"active","online":true}"#;
        let parsed: Presence = decode_response("users.getPresence", body).expect("decode ok");
        assert_eq!(
            parsed,
            Presence {
                presence: "active".to_string(),
                online: true,
            }
        );
    }

    #[test]
    fn ok_envelope_ignores_error_field() {
        let body = r#"{"ok":true,"error":"stale","presence":"away","online":false}"#;
        let parsed: Presence = decode_response("users.getPresence", body).expect("decode ok");
        assert_eq!(parsed.presence, "away");
    }

    #[test]
    fn failed_envelope_carries_code_verbatim() {
        let body = r#"{"ok":false,"error":"invalid_auth"}"#;
        let err = decode_response::<Map<String, Value>>("auth.test", body)
            .expect_err("failed envelope");

        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.application_code(), Some("invalid_auth"));
        assert_eq!(err.to_string(), "invalid_auth");
    }

    #[test]
    fn failed_envelope_wins_over_malformed_payload() {
        let body = r#"{"ok":false,"error":"user_not_found","presence":42}"#;
        let err = decode_response::<Presence>("users.getPresence", body)
            .expect_err("failed envelope");
        assert_eq!(err.application_code(), Some("user_not_found"));
    }

    #[test]
    fn malformed_payload_on_ok_is_decode_error() {
        let body = r#"{"ok":true,"presence":42}"#;
        let err = decode_response::<Presence>("users.getPresence", body)
            .expect_err("payload mismatch");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn non_object_body_is_decode_error() {
        for body in ["[true,\"x\"]", "\"ok\"", "not json", ""] {
            let err = decode_response::<Map<String, Value>>("auth.test", body)
                .expect_err("non-object body");
            assert_eq!(err.kind(), ErrorKind::Decode, "body {body:?}");
        }
    }

    #[test]
    fn missing_or_mistyped_ok_is_decode_error() {
        for body in [r#"{"error":"x"}"#, r#"{"ok":"true"}"#] {
            let err = decode_response::<Map<String, Value>>("auth.test", body)
                .expect_err("bad envelope");
            assert_eq!(err.kind(), ErrorKind::Decode, "body {body}");
        }
    }

    #[test]
    fn failed_envelope_without_code_is_decode_error() {
        for body in [r#"{"ok":false}"#, r#"{"ok":false,"error":""}"#] {
            let err = decode_response::<Map<String, Value>>("auth.test", body)
                .expect_err("codeless failure");
            assert_eq!(err.kind(), ErrorKind::Decode, "body {body}");
        }
    }

    #[test]
    fn decode_error_truncates_body() {
        let body = "x".repeat(1000);
        match decode_response::<Map<String, Value>>("auth.test", &body) {
            Err(ApiError::Decode { body, .. }) => assert_eq!(body.len(), 220),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn failed_envelope_only_matches_application_errors() {
        assert!(failed_envelope("chat.postMessage", r#"{"ok":false,"error":"ratelimited"}"#)
            .is_some());
        assert!(failed_envelope("chat.postMessage", r#"{"ok":true}"#).is_none());
        assert!(failed_envelope("chat.postMessage", "<html>bad gateway</html>").is_none());
    }

    #[test]
    fn failure_code_requires_ok_false() {
        let envelope = ResponseEnvelope {
            ok: true,
            error: Some("ignored".to_string()),
        };
        assert_eq!(envelope.failure_code(), None);
    }
}
