//! Real-time messaging bootstrap.
//!
//! - `bootstrap`: exchanges the session token for a one-time websocket
//!   endpoint and optionally opens it.
//! - `proto`: snapshot types decoded from `rtm.start`.

/// Endpoint handshake and socket open.
pub mod bootstrap;
/// RTM payload types.
pub mod proto;

pub use bootstrap::{bootstrap, RtmEndpoint, RtmMode, RtmSocket};
pub use proto::{RtmSnapshot, SelfInfo, TeamInfo};
