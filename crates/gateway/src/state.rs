use std::{sync::Arc, time::Duration};

use {hourbell_channels::SharedGateway, hourbell_commands::CommandInterpreter, secrecy::Secret};

/// Shared state behind every request.
#[derive(Clone)]
pub struct AppState {
    pub interpreter: Arc<CommandInterpreter>,
    pub gateway: SharedGateway,
    /// `None` when the channel secret was not configured; intake then answers
    /// 503 instead of processing unauthenticated traffic.
    pub channel_secret: Option<Arc<Secret<String>>>,
    /// Bound on each reply call.
    pub reply_timeout: Duration,
}

impl AppState {
    pub fn new(
        interpreter: Arc<CommandInterpreter>,
        gateway: SharedGateway,
        channel_secret: Option<Secret<String>>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            interpreter,
            gateway,
            channel_secret: channel_secret.map(Arc::new),
            reply_timeout,
        }
    }
}
