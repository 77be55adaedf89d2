mod wiring;

use std::net::SocketAddr;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    hourbell_config::{AppConfig, StoreConfig},
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "hourbell", about = "Hourbell: hourly reminders over LINE", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides HOURBELL_BIND).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides PORT / HOURBELL_PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the webhook and run the sweep (default when no subcommand is provided).
    Serve,
    /// Run a single sweep and print its report as JSON.
    Sweep {
        /// Only count who is due; send nothing and write nothing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Create or upgrade the SQLite schema and exit.
    Migrate,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "hourbell starting");

    let mut config = hourbell_config::from_env().context("invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if !config.missing_credentials.is_empty() {
        error!(
            missing = ?config.missing_credentials,
            "channel credentials are missing: webhook intake will answer 503 and no reminders will be sent"
        );
    }

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Sweep { dry_run }) => sweep_once(config, dry_run).await,
        Some(Commands::Migrate) => migrate(&config.store).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind, config.server.port
            )
        })?;

    let store = wiring::open_store(&config.store).await?;
    let components = wiring::build(config, store);

    if components.configured {
        components.sweep.start().await;
    } else {
        error!("sweep not started: no channel credentials");
    }

    let app = hourbell_gateway::build_app(components.state);
    let result = hourbell_gateway::serve(addr, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
    })
    .await;

    components.sweep.stop().await;
    result
}

async fn sweep_once(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let store = wiring::open_store(&config.store).await?;
    let components = wiring::build(config, store);

    let report = if dry_run {
        components.sweep.preview().await
    } else if components.configured {
        components.sweep.run_once().await
    } else {
        anyhow::bail!("cannot sweep without LINE_CHANNEL_ACCESS_TOKEN and LINE_CHANNEL_SECRET");
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn migrate(store: &StoreConfig) -> anyhow::Result<()> {
    match store {
        StoreConfig::Memory => {
            info!("in-memory store selected, nothing to migrate");
        },
        StoreConfig::Sqlite { .. } => {
            wiring::open_store(store).await?;
            info!("migrations applied");
        },
    }
    Ok(())
}
