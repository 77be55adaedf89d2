//! Config schema types.

use std::{fmt, str::FromStr, time::Duration};

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_BROADCAST_MESSAGE: &str =
    "⏰ Reminder: stand up, stretch, and drink some water. Send \"stop\" to unsubscribe.";

/// Longest text a single chat message may carry, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Everything the process needs to run.
#[derive(Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// `None` when either channel secret is missing; see [`AppConfig::missing_credentials`].
    pub credentials: Option<ChannelCredentials>,
    /// Names of the required variables that were not set.
    pub missing_credentials: Vec<&'static str>,
    pub store: StoreConfig,
    pub sweep: SweepConfig,
    /// Messaging API base URL.
    pub api_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Channel access token and channel secret issued by the LINE console.
pub struct ChannelCredentials {
    pub access_token: Secret<String>,
    pub channel_secret: Secret<String>,
}

impl fmt::Debug for ChannelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCredentials")
            .field("access_token", &"[REDACTED]")
            .field("channel_secret", &"[REDACTED]")
            .finish()
    }
}

/// Where subscriber records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Process-local map; lost on restart.
    Memory,
    /// sqlx SQLite connection URL.
    Sqlite { url: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            url: "sqlite://hourbell.db?mode=rwc".into(),
        }
    }
}

/// How the sweep hands due subscribers to the gateway.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One push call per due subscriber.
    #[default]
    Push,
    /// Due subscribers batched into multicast calls of at most 500.
    Multicast,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "multicast" => Ok(Self::Multicast),
            other => Err(format!("expected push or multicast, got {other}")),
        }
    }
}

/// Sweep cadence, notification interval, and delivery bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// A subscriber is due once this much time has passed since the last delivery.
    pub notify_interval: Duration,
    /// How often the sweep runs. Effective intervals drift by at most this much.
    pub sweep_interval: Duration,
    pub broadcast_message: String,
    pub delivery_mode: DeliveryMode,
    /// Bound on each outbound call, replies included.
    pub delivery_timeout: Duration,
    /// Max deliveries in flight within one sweep.
    pub delivery_concurrency: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            notify_interval: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            broadcast_message: DEFAULT_BROADCAST_MESSAGE.into(),
            delivery_mode: DeliveryMode::Push,
            delivery_timeout: Duration::from_secs(10),
            delivery_concurrency: 16,
        }
    }
}
