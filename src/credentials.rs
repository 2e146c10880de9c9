use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Access token used to authenticate every Web API call.
///
/// The token is fixed at construction and never mutated afterwards, so a
/// single value can be shared across concurrent calls without locking.
#[derive(Clone)]
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    /// Wraps a bot or user token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }

    pub(crate) fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl From<SecretString> for Credentials {
    fn from(token: SecretString) -> Self {
        Self { token }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
