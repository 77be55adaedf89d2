use std::sync::Arc;

use {
    hourbell_common::SharedClock,
    hourbell_line::{MessageContent, WebhookEvent},
    hourbell_store::{SubscriberStore, Subscription},
    tracing::{debug, info},
};

use crate::{Result, parse::Command};

pub const START_REPLY: &str =
    "You're subscribed. I'll send you a reminder at each interval. Send \"stop\" to unsubscribe.";
pub const STOP_REPLY: &str =
    "You're unsubscribed. No more reminders. Send \"start\" to subscribe again.";
pub const HELP_REPLY: &str = "Commands:\nstart - get recurring reminders\nstop - stop the reminders";

/// Applies inbound chat events to the subscriber store.
///
/// Holds no state of its own beyond the store and the clock, so one
/// instance can serve any number of concurrent events.
pub struct CommandInterpreter {
    store: Arc<dyn SubscriberStore>,
    clock: SharedClock,
}

impl CommandInterpreter {
    pub fn new(store: Arc<dyn SubscriberStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Handle one event and return the reply text, if any.
    ///
    /// Only text messages from a user are acted on. Everything else (no user
    /// id, stickers, follow/unfollow, unknown event types) yields `Ok(None)`
    /// without touching the store. Store errors are
    /// returned to the caller.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<Option<String>> {
        let Some(user_id) = event.user_id() else {
            debug!(kind = event.kind(), "ignoring event without a user id");
            return Ok(None);
        };

        match event {
            WebhookEvent::Message {
                message: MessageContent::Text { text },
                ..
            } => self.apply(user_id, Command::parse(text)).await.map(Some),
            WebhookEvent::Message { .. }
            | WebhookEvent::Follow { .. }
            | WebhookEvent::Unfollow { .. }
            | WebhookEvent::Other => {
                debug!(subscriber_id = %user_id, kind = event.kind(), "ignoring non-text event");
                Ok(None)
            },
        }
    }

    async fn apply(&self, user_id: &str, command: Command) -> Result<String> {
        match command {
            Command::Start => {
                let subscription = Subscription::new(self.clock.now());
                self.store.put(user_id, &subscription).await?;
                info!(subscriber_id = %user_id, start_time = %subscription.start_time, "subscribed");
                Ok(START_REPLY.to_string())
            },
            Command::Stop => {
                self.store.delete(user_id).await?;
                info!(subscriber_id = %user_id, "unsubscribed");
                Ok(STOP_REPLY.to_string())
            },
            Command::Unknown => Ok(HELP_REPLY.to_string()),
        }
    }
}
