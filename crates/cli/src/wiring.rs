//! Builds the long-lived components from configuration.

use std::{sync::Arc, time::Duration};

use {
    hourbell_channels::{SharedGateway, UnconfiguredGateway},
    hourbell_commands::CommandInterpreter,
    hourbell_common::{SharedClock, SystemClock},
    hourbell_config::{AppConfig, StoreConfig},
    hourbell_gateway::AppState,
    hourbell_line::LineClient,
    hourbell_store::{InMemoryStore, SqliteStore, SubscriberStore},
    hourbell_sweep::SweepService,
    tracing::{info, warn},
};

pub struct Components {
    pub state: AppState,
    pub sweep: Arc<SweepService>,
    /// Whether channel credentials were configured. Without them the sweep
    /// must not be started.
    pub configured: bool,
}

pub async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn SubscriberStore>> {
    match config {
        StoreConfig::Memory => {
            warn!("using the in-memory subscriber store; subscriptions are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        },
        StoreConfig::Sqlite { url } => {
            let store = SqliteStore::new(url).await?;
            info!(url = %url, "subscriber store opened");
            Ok(Arc::new(store))
        },
    }
}

/// Wire store, clock, gateway, interpreter and sweep together.
pub fn build(config: AppConfig, store: Arc<dyn SubscriberStore>) -> Components {
    let clock: SharedClock = Arc::new(SystemClock);
    let timeout = config.sweep.delivery_timeout;

    let (gateway, channel_secret) = match config.credentials {
        Some(credentials) => {
            let client: SharedGateway = Arc::new(LineClient::with_base_url(
                credentials.access_token,
                config.api_base_url.as_str(),
                timeout,
            ));
            (client, Some(credentials.channel_secret))
        },
        None => {
            let unconfigured: SharedGateway = Arc::new(UnconfiguredGateway);
            (unconfigured, None)
        },
    };
    let configured = channel_secret.is_some();

    let sweep = SweepService::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        Arc::clone(&clock),
        config.sweep,
    );
    let interpreter = Arc::new(CommandInterpreter::new(store, clock));
    let state = AppState::new(interpreter, gateway, channel_secret, request_timeout(timeout));

    Components {
        state,
        sweep,
        configured,
    }
}

/// Reply bound: the delivery timeout, capped at ten seconds.
fn request_timeout(delivery_timeout: Duration) -> Duration {
    delivery_timeout.min(Duration::from_secs(10))
}
