//! LINE Messaging API adapter.
//!
//! - [`signature`]: the `X-Line-Signature` check over the raw webhook body.
//! - [`webhook`]: the inbound envelope and event types.
//! - [`client`]: an outbound [`hourbell_channels::MessageGateway`] over HTTPS.

pub mod client;
pub mod signature;
pub mod webhook;

pub use {
    client::{DEFAULT_API_BASE_URL, LineClient},
    signature::{SIGNATURE_HEADER, verify_signature},
    webhook::{MessageContent, Source, WebhookEnvelope, WebhookEvent},
};
