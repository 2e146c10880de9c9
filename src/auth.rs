use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::credentials::Credentials;
use crate::debug::{DebugSink, DebugTracer};
use crate::rtm::bootstrap::{bootstrap, RtmEndpoint, RtmMode};
use crate::web_api::{ApiError, Params, WebApiClient, WebApiClientOptions};

const AUTH_TEST_METHOD: &str = "auth.test";

/// Identity bound to the session token, as reported by `auth.test`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthIdentity {
    pub url: String,
    pub team: String,
    pub user: String,
    pub team_id: String,
    pub user_id: String,
}

/// Long-lived authenticated session.
///
/// Owns the credentials (through its [`WebApiClient`]) and the debug tracer.
/// Clones share both, so a session can be handed to concurrent tasks.
#[derive(Clone)]
pub struct AuthSession {
    api: WebApiClient,
    tracer: Arc<DebugTracer>,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(
            Credentials::new(token),
            WebApiClientOptions::default(),
            DebugTracer::new(),
        )
    }

    pub fn with_options(
        credentials: Credentials,
        options: WebApiClientOptions,
        tracer: DebugTracer,
    ) -> Result<Self, ApiError> {
        let tracer = Arc::new(tracer);
        let api = WebApiClient::with_options(credentials, options, Arc::clone(&tracer))?;
        Ok(Self { api, tracer })
    }

    /// Creates a session whose traces go to `sink` instead of standard error.
    pub fn with_debug_sink(
        token: impl Into<String>,
        sink: Arc<dyn DebugSink>,
    ) -> Result<Self, ApiError> {
        Self::with_options(
            Credentials::new(token),
            WebApiClientOptions::default(),
            DebugTracer::with_sink(sink),
        )
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.api = self.api.with_base_url(base_url);
        self
    }

    /// Executor shared by every call made through this session.
    pub fn api(&self) -> &WebApiClient {
        &self.api
    }

    /// Switches debug tracing on or off.
    ///
    /// Leave this off in production; traces include full response bodies.
    pub fn set_debug(&self, enabled: bool) {
        self.tracer.set_debug(enabled);
    }

    pub fn is_debug(&self) -> bool {
        self.tracer.is_enabled()
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.tracer.debugf(args);
    }

    #[track_caller]
    pub fn debugln(&self, message: impl fmt::Display) {
        self.tracer.debugln(message);
    }

    /// Checks that the token is accepted and returns the identity bound to it.
    pub async fn auth_test(&self, cancel: &CancellationToken) -> Result<AuthIdentity, ApiError> {
        self.api
            .execute(cancel, AUTH_TEST_METHOD, &Params::new())
            .await
    }

    /// Exchanges the token for a single-use RTM websocket endpoint.
    pub async fn rtm_bootstrap(
        &self,
        cancel: &CancellationToken,
        mode: RtmMode,
    ) -> Result<RtmEndpoint, ApiError> {
        bootstrap(&self.api, cancel, mode).await
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("base_url", &self.api.base_url())
            .field("debug", &self.is_debug())
            .finish_non_exhaustive()
    }
}
