use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, Result};

/// Platform ceiling on recipients of a single multicast call.
pub const MULTICAST_MAX_RECIPIENTS: usize = 500;

/// Send messages to chat users.
///
/// Each call is a single attempt; retries are the caller's business.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Answer an inbound event. `reply_token` is single-use and short-lived.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Send to one user.
    async fn push(&self, to: &str, text: &str) -> Result<()>;

    /// Send the same text to many users. `to` must not exceed
    /// [`MULTICAST_MAX_RECIPIENTS`]; see [`chunk_recipients`].
    async fn multicast(&self, to: &[String], text: &str) -> Result<()>;
}

pub type SharedGateway = Arc<dyn MessageGateway>;

/// Stand-in used when no platform credentials are configured. Every call
/// fails with [`Error::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl MessageGateway for UnconfiguredGateway {
    async fn reply(&self, _reply_token: &str, _text: &str) -> Result<()> {
        Err(Error::unavailable("no channel access token configured"))
    }

    async fn push(&self, _to: &str, _text: &str) -> Result<()> {
        Err(Error::unavailable("no channel access token configured"))
    }

    async fn multicast(&self, _to: &[String], _text: &str) -> Result<()> {
        Err(Error::unavailable("no channel access token configured"))
    }
}

/// Split a recipient list (or anything keyed by recipient) into
/// multicast-sized batches.
pub fn chunk_recipients<T>(recipients: &[T]) -> impl Iterator<Item = &[T]> {
    recipients.chunks(MULTICAST_MAX_RECIPIENTS)
}
