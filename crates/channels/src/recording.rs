//! In-process gateway that records what would have been sent.
//!
//! Used by tests across the workspace.

use std::{collections::HashSet, sync::Mutex, time::Duration};

use {async_trait::async_trait, tracing::debug};

use crate::{Error, MULTICAST_MAX_RECIPIENTS, Result, gateway::MessageGateway};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Reply { reply_token: String, text: String },
    Push { to: String, text: String },
    Multicast { to: Vec<String>, text: String },
}

#[derive(Default)]
struct Behaviour {
    fail_all: bool,
    failing_recipients: HashSet<String>,
    delay: Option<Duration>,
}

/// Records every call; can be told to fail or stall.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    behaviour: Mutex<Behaviour>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail until reset.
    pub fn set_fail_all(&self, fail: bool) {
        self.behaviour.lock().unwrap_or_else(|e| e.into_inner()).fail_all = fail;
    }

    /// Make pushes to (and multicasts including) `id` fail.
    pub fn fail_recipient(&self, id: impl Into<String>) {
        self.behaviour
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing_recipients
            .insert(id.into());
    }

    /// Sleep this long inside every call before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.behaviour.lock().unwrap_or_else(|e| e.into_inner()).delay = delay;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recipients of successful pushes, in call order.
    pub fn pushed_to(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Push { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Reply { reply_token, text } => Some((reply_token, text)),
                _ => None,
            })
            .collect()
    }

    async fn admit(&self, operation: &str, recipients: &[&str]) -> Result<()> {
        let (fail, delay) = {
            let b = self.behaviour.lock().unwrap_or_else(|e| e.into_inner());
            let fail = b.fail_all
                || recipients
                    .iter()
                    .any(|r| b.failing_recipients.contains(*r));
            (fail, b.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(Error::rejected(operation, 500, "recording gateway told to fail"));
        }
        Ok(())
    }

    fn record(&self, message: SentMessage) {
        debug!(?message, "recorded outbound message");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        self.admit("reply", &[]).await?;
        self.record(SentMessage::Reply {
            reply_token: reply_token.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn push(&self, to: &str, text: &str) -> Result<()> {
        self.admit("push", &[to]).await?;
        self.record(SentMessage::Push {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn multicast(&self, to: &[String], text: &str) -> Result<()> {
        if to.len() > MULTICAST_MAX_RECIPIENTS {
            return Err(Error::invalid_input(format!(
                "multicast to {} recipients exceeds {MULTICAST_MAX_RECIPIENTS}",
                to.len()
            )));
        }
        let recipients: Vec<&str> = to.iter().map(String::as_str).collect();
        self.admit("multicast", &recipients).await?;
        self.record(SentMessage::Multicast {
            to: to.to_vec(),
            text: text.to_string(),
        });
        Ok(())
    }
}
