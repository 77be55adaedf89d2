//! Outbound Messaging API client.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::json,
    tracing::debug,
};

use hourbell_channels::{Error, MULTICAST_MAX_RECIPIENTS, MessageGateway, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.line.me";

/// Longest text a single LINE text message may carry.
pub const MAX_TEXT_LEN: usize = 5000;

/// LINE Messaging API client. Every request carries its own timeout.
pub struct LineClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Secret<String>,
    timeout: Duration,
}

impl LineClient {
    pub fn new(access_token: Secret<String>, timeout: Duration) -> Self {
        Self::with_base_url(access_token, DEFAULT_API_BASE_URL, timeout)
    }

    /// Point the client at a different API host (used by tests).
    pub fn with_base_url(
        access_token: Secret<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            timeout,
        }
    }

    async fn post(&self, operation: &str, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(operation, self.timeout)
                } else {
                    Error::external(format!("LINE {operation} request failed"), e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::rejected(operation, status.as_u16(), text));
        }

        debug!(operation, "LINE API call accepted");
        Ok(())
    }
}

fn text_messages(text: &str) -> Result<serde_json::Value> {
    if text.is_empty() {
        return Err(Error::invalid_input("message text is empty"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(Error::invalid_input(format!(
            "message text exceeds {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(json!([{ "type": "text", "text": text }]))
}

#[async_trait]
impl MessageGateway for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let messages = text_messages(text)?;
        self.post(
            "reply",
            "/v2/bot/message/reply",
            json!({ "replyToken": reply_token, "messages": messages }),
        )
        .await
    }

    async fn push(&self, to: &str, text: &str) -> Result<()> {
        let messages = text_messages(text)?;
        self.post(
            "push",
            "/v2/bot/message/push",
            json!({ "to": to, "messages": messages }),
        )
        .await
    }

    async fn multicast(&self, to: &[String], text: &str) -> Result<()> {
        if to.is_empty() {
            return Ok(());
        }
        if to.len() > MULTICAST_MAX_RECIPIENTS {
            return Err(Error::invalid_input(format!(
                "multicast to {} recipients exceeds {MULTICAST_MAX_RECIPIENTS}",
                to.len()
            )));
        }
        let messages = text_messages(text)?;
        self.post(
            "multicast",
            "/v2/bot/message/multicast",
            json!({ "to": to, "messages": messages }),
        )
        .await
    }
}
