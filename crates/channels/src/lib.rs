//! Outbound messaging contract.
//!
//! A chat platform adapter (LINE today) implements [`MessageGateway`]; the
//! command interpreter and the sweep only ever see the trait.

pub mod error;
pub mod gateway;
pub mod recording;

pub use {
    error::{Error, Result},
    gateway::{
        MULTICAST_MAX_RECIPIENTS, MessageGateway, SharedGateway, UnconfiguredGateway,
        chunk_recipients,
    },
    recording::{RecordingGateway, SentMessage},
};
