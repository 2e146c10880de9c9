//! Core client for the Slack Web API and RTM bootstrap.
//!
//! The crate is organized by transport surface:
//! - `web_api`: cancellable request executor and response envelope handling.
//! - `auth`: long-lived session owning credentials and debug tracing.
//! - `rtm`: websocket endpoint handshake for real-time messaging.
//! - `methods`: thin typed wrappers over the executor.
//! - `debug`: opt-in diagnostic tracing.

/// Session type and `auth.test`.
pub mod auth;
/// Access token holder.
pub mod credentials;
/// Debug toggle and sinks.
pub mod debug;
/// Typed wrappers for individual Web API methods.
pub mod methods;
/// RTM endpoint bootstrap.
pub mod rtm;
/// Web API executor and error types.
pub mod web_api;

pub use auth::{AuthIdentity, AuthSession};
pub use credentials::Credentials;
pub use tokio_util::sync::CancellationToken;
pub use web_api::{ApiError, ErrorKind, Params, WebApiClient};
