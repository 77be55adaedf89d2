//! Inbound webhook payload types.
//!
//! The envelope is parsed first with the events left as raw JSON; each event
//! is then decoded on its own so one unexpected event cannot sink the batch.

use serde::Deserialize;

/// The batch wrapper LINE posts to the webhook URL.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Bot user id the events were sent to.
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<serde_json::Value>,
}

impl WebhookEnvelope {
    pub fn parse(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// One inbound event. Types this bot does not act on land in `Other`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WebhookEvent {
    Message {
        #[serde(default)]
        reply_token: Option<String>,
        #[serde(default)]
        source: Option<Source>,
        message: MessageContent,
    },
    /// The user added the bot as a friend (or unblocked it).
    Follow {
        #[serde(default)]
        reply_token: Option<String>,
        #[serde(default)]
        source: Option<Source>,
    },
    /// The user blocked the bot.
    Unfollow {
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(other)]
    Other,
}

impl WebhookEvent {
    pub fn decode(raw: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(raw)
    }

    /// The sending user's id, if the event carries a non-empty one.
    pub fn user_id(&self) -> Option<&str> {
        let source = match self {
            Self::Message { source, .. } | Self::Follow { source, .. } | Self::Unfollow { source } => {
                source.as_ref()
            },
            Self::Other => None,
        }?;
        source.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn reply_token(&self) -> Option<&str> {
        match self {
            Self::Message { reply_token, .. } | Self::Follow { reply_token, .. } => {
                reply_token.as_deref().filter(|t| !t.is_empty())
            },
            Self::Unfollow { .. } | Self::Other => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::Other => "other",
        }
    }
}

/// Payload of a message event.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text { text: String },
    /// Stickers, images, locations and the rest.
    #[serde(other)]
    Other,
}

/// Who sent the event.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// `user`, `group` or `room`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}
