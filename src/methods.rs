//! Typed wrappers for a handful of Web API methods.
//!
//! Each wrapper only maps its arguments into [`Params`] and picks the
//! payload type; envelope handling, auth and cancellation all live in
//! [`WebApiClient::execute`].

use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::web_api::{ApiError, Params, WebApiClient};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: User,
}

/// Optional fields for `chat.postMessage`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostMessageParams {
    pub thread_ts: Option<String>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
    pub as_user: bool,
    pub unfurl_links: bool,
    pub reply_broadcast: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    Auto,
    Away,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Away => "away",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmojiListResponse {
    emoji: HashMap<String, String>,
}

impl WebApiClient {
    /// `users.info`
    pub async fn get_user_info(
        &self,
        cancel: &CancellationToken,
        user: &str,
    ) -> Result<User, ApiError> {
        let response: UserInfoResponse = self
            .execute(cancel, "users.info", &single("user", user))
            .await?;
        Ok(response.user)
    }

    /// `chat.postMessage`
    pub async fn post_message(
        &self,
        cancel: &CancellationToken,
        channel: &str,
        text: &str,
        params: &PostMessageParams,
    ) -> Result<PostedMessage, ApiError> {
        self.execute(
            cancel,
            "chat.postMessage",
            &post_message_params(channel, text, params),
        )
        .await
    }

    /// `users.setPresence`
    pub async fn set_user_presence(
        &self,
        cancel: &CancellationToken,
        presence: Presence,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .execute(
                cancel,
                "users.setPresence",
                &single("presence", presence.as_str()),
            )
            .await?;
        Ok(())
    }

    /// `emoji.list`; maps emoji names to image URLs or `alias:` targets.
    pub async fn get_emoji(
        &self,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, String>, ApiError> {
        let response: EmojiListResponse = self.execute(cancel, "emoji.list", &Params::new()).await?;
        Ok(response.emoji)
    }
}

fn single(key: &str, value: &str) -> Params {
    Params::from([(key.to_string(), value.to_string())])
}

fn post_message_params(channel: &str, text: &str, options: &PostMessageParams) -> Params {
    let mut params = Params::new();
    params.insert("channel".to_string(), channel.to_string());
    params.insert("text".to_string(), text.to_string());

    let optional = [
        ("thread_ts", options.thread_ts.as_deref()),
        ("username", options.username.as_deref()),
        ("icon_emoji", options.icon_emoji.as_deref()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            params.insert(key.to_string(), value.to_string());
        }
    }

    let flags = [
        ("as_user", options.as_user),
        ("unfurl_links", options.unfurl_links),
        ("reply_broadcast", options.reply_broadcast),
    ];
    for (key, enabled) in flags {
        if enabled {
            params.insert(key.to_string(), "true".to_string());
        }
    }

    params
}
