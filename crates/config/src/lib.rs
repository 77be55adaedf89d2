//! Configuration loading from the process environment.
//!
//! Everything is read once at startup. Secrets stay wrapped in
//! [`secrecy::Secret`] and are never logged.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{ConfigError, Result},
    loader::{from_env, from_lookup},
    schema::{
        AppConfig, ChannelCredentials, DEFAULT_BROADCAST_MESSAGE, DeliveryMode, MAX_MESSAGE_CHARS,
        ServerConfig, StoreConfig, SweepConfig,
    },
};
