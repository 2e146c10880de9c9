//! Web API request execution.
//!
//! - `client`: authenticated, cancellable executor for a single method call.
//! - `envelope`: the `{ok, error}` response contract and the error taxonomy.

/// Executor, options, and request parameters.
pub mod client;
/// Response envelope decoding and error types.
pub mod envelope;

pub use client::{Params, WebApiClient, WebApiClientOptions, WebApiDefaults, WEB_API_BASE_URL};
pub use envelope::{ApiError, ErrorKind, ResponseEnvelope, TransportError};
