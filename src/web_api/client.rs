use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::credentials::Credentials;
use crate::debug::DebugTracer;
use crate::web_api::envelope::{
    decode_response, failed_envelope, summarize_body, ApiError, TransportError,
};

/// Production Web API base URL.
pub const WEB_API_BASE_URL: &str = "https://slack.com/api/";

const TOKEN_FIELD: &str = "token";

/// Method-specific form parameters.
///
/// Ordered so the encoded body is stable. The token is never part of this
/// map; [`WebApiClient`] injects it.
pub type Params = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WebApiDefaults;

impl WebApiDefaults {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

#[derive(Clone, Debug)]
pub struct WebApiClientOptions {
    /// Base URL every method name is appended to.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Client-side bound for one call. Expiry is reported as a transport
    /// error, unlike caller cancellation.
    pub request_timeout: Duration,
}

impl Default for WebApiClientOptions {
    fn default() -> Self {
        Self {
            base_url: WEB_API_BASE_URL.to_string(),
            connect_timeout: WebApiDefaults::CONNECT_TIMEOUT,
            request_timeout: WebApiDefaults::REQUEST_TIMEOUT,
        }
    }
}

/// Authenticated executor for Web API methods.
///
/// Cloning is cheap and clones share the connection pool and the debug
/// tracer.
#[derive(Clone, Debug)]
pub struct WebApiClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
    request_timeout: Duration,
    tracer: Arc<DebugTracer>,
}

impl WebApiClient {
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_options(
            credentials,
            WebApiClientOptions::default(),
            Arc::new(DebugTracer::new()),
        )
    }

    pub fn with_options(
        credentials: Credentials,
        options: WebApiClientOptions,
        tracer: Arc<DebugTracer>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|err| ApiError::transport("client", TransportError::Request(err)))?;

        Ok(Self {
            http,
            credentials,
            base_url: normalize_base_url(&options.base_url),
            request_timeout: options.request_timeout,
            tracer,
        })
    }

    /// Points the client at a different API host, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls `method` and decodes the payload sharing the response envelope.
    ///
    /// Exactly one request is attempted. If `cancel` fires first the
    /// in-flight request is dropped, which returns its connection to the
    /// pool, and any response that arrives later is discarded.
    pub async fn execute<T>(
        &self,
        cancel: &CancellationToken,
        method: &str,
        params: &Params,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        if cancel.is_cancelled() {
            return Err(ApiError::cancelled(method));
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(event = "api_call_cancelled", method);
                self.tracer.debugf(format_args!("{method} cancelled"));
                return Err(ApiError::cancelled(method));
            }
            result = self.send_attempt(method, url, params) => result?,
        };

        decode_response(method, &body)
    }

    /// Untyped variant of [`execute`](Self::execute) returning the whole
    /// response object.
    pub async fn execute_value(
        &self,
        cancel: &CancellationToken,
        method: &str,
        params: &Params,
    ) -> Result<Map<String, Value>, ApiError> {
        self.execute(cancel, method, params).await
    }

    fn endpoint(&self, method: &str) -> Result<Url, ApiError> {
        if !is_valid_method(method) {
            return Err(ApiError::InvalidMethod(method.to_string()));
        }
        Url::parse(&format!("{}{}", self.base_url, method))
            .map_err(|_| ApiError::InvalidMethod(method.to_string()))
    }

    async fn send_attempt(
        &self,
        method: &str,
        url: Url,
        params: &Params,
    ) -> Result<String, ApiError> {
        self.tracer.debugf(format_args!("calling {method}"));

        let form = form_with_token(params, self.credentials.token());
        let response = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                debug!(event = "api_call_send_failed", method, error = %err);
                ApiError::transport(method, TransportError::Request(err))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::transport(method, TransportError::ResponseRead(err)))?;

        self.tracer
            .debugf(format_args!("{method} status={status} body={body}"));

        if !status.is_success() {
            if let Some(err) = failed_envelope(method, &body) {
                return Err(err);
            }
            return Err(ApiError::transport(
                method,
                TransportError::HttpStatus {
                    status,
                    body: summarize_body(&body),
                },
            ));
        }

        Ok(body)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

fn is_valid_method(method: &str) -> bool {
    !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

fn form_with_token<'a>(params: &'a Params, token: &'a str) -> Vec<(&'a str, &'a str)> {
    let mut form: Vec<(&str, &str)> = params
        .iter()
        .filter(|(key, _)| key.as_str() != TOKEN_FIELD)
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    form.push((TOKEN_FIELD, token));
    form
}
