//! Build an [`AppConfig`] from environment variables.

use std::{str::FromStr, time::Duration};

use {secrecy::Secret, tracing::debug};

use crate::{
    error::{ConfigError, Result},
    schema::{
        AppConfig, ChannelCredentials, MAX_MESSAGE_CHARS, ServerConfig, StoreConfig, SweepConfig,
    },
};

pub const ACCESS_TOKEN_VAR: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const CHANNEL_SECRET_VAR: &str = "LINE_CHANNEL_SECRET";

/// Load configuration from the process environment.
///
/// Missing channel credentials are not an error here: they are reported in
/// [`AppConfig::missing_credentials`] so the caller can decide how loudly to
/// complain. Malformed values are an error.
pub fn from_env() -> Result<AppConfig> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Load configuration using a custom lookup function.
///
/// This is the implementation used by [`from_env`]; the separate signature
/// makes it testable without mutating the process environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    // Blank values count as unset.
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let access_token = get(ACCESS_TOKEN_VAR);
    let channel_secret = get(CHANNEL_SECRET_VAR);
    let mut missing_credentials = Vec::new();
    if access_token.is_none() {
        missing_credentials.push(ACCESS_TOKEN_VAR);
    }
    if channel_secret.is_none() {
        missing_credentials.push(CHANNEL_SECRET_VAR);
    }
    let credentials = match (access_token, channel_secret) {
        (Some(token), Some(secret)) => Some(ChannelCredentials {
            access_token: Secret::new(token),
            channel_secret: Secret::new(secret),
        }),
        _ => None,
    };

    let defaults = ServerConfig::default();
    let port_var = if get("HOURBELL_PORT").is_some() {
        "HOURBELL_PORT"
    } else {
        "PORT"
    };
    let server = ServerConfig {
        bind: get("HOURBELL_BIND").unwrap_or(defaults.bind),
        port: parse_or(get(port_var), port_var, defaults.port)?,
    };

    let store = match get("HOURBELL_DATABASE_URL") {
        Some(url) if url.trim().eq_ignore_ascii_case("memory") => StoreConfig::Memory,
        Some(url) => StoreConfig::Sqlite { url },
        None => StoreConfig::default(),
    };

    let sweep_defaults = SweepConfig::default();
    let sweep = SweepConfig {
        notify_interval: secs_or(
            get("HOURBELL_NOTIFY_INTERVAL_SECS"),
            "HOURBELL_NOTIFY_INTERVAL_SECS",
            sweep_defaults.notify_interval,
        )?,
        sweep_interval: secs_or(
            get("HOURBELL_SWEEP_INTERVAL_SECS"),
            "HOURBELL_SWEEP_INTERVAL_SECS",
            sweep_defaults.sweep_interval,
        )?,
        broadcast_message: message_or(
            get("HOURBELL_BROADCAST_MESSAGE"),
            "HOURBELL_BROADCAST_MESSAGE",
            sweep_defaults.broadcast_message,
        )?,
        delivery_mode: parse_or(
            get("HOURBELL_DELIVERY_MODE"),
            "HOURBELL_DELIVERY_MODE",
            sweep_defaults.delivery_mode,
        )?,
        delivery_timeout: secs_or(
            get("HOURBELL_DELIVERY_TIMEOUT_SECS"),
            "HOURBELL_DELIVERY_TIMEOUT_SECS",
            sweep_defaults.delivery_timeout,
        )?,
        delivery_concurrency: positive_or(
            get("HOURBELL_DELIVERY_CONCURRENCY"),
            "HOURBELL_DELIVERY_CONCURRENCY",
            sweep_defaults.delivery_concurrency,
        )?,
    };

    let api_base_url = get("LINE_API_BASE_URL").unwrap_or_else(|| "https://api.line.me".into());

    debug!(
        bind = %server.bind,
        port = server.port,
        ?store,
        ?sweep,
        "configuration loaded"
    );

    Ok(AppConfig {
        server,
        credentials,
        missing_credentials,
        store,
        sweep,
        api_base_url,
    })
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, value.clone(), e.to_string())),
    }
}

fn message_or(raw: Option<String>, var: &'static str, default: String) -> Result<String> {
    let Some(text) = raw else {
        return Ok(default);
    };
    let chars = text.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ConfigError::invalid(
            var,
            format!("{chars} characters"),
            format!("must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(text)
}

fn positive_or(raw: Option<String>, var: &'static str, default: usize) -> Result<usize> {
    let n = parse_or(raw, var, default)?;
    if n == 0 {
        return Err(ConfigError::invalid(var, "0", "must be greater than zero"));
    }
    Ok(n)
}

fn secs_or(raw: Option<String>, var: &'static str, default: Duration) -> Result<Duration> {
    let secs = positive_or(raw, var, default.as_secs() as usize)?;
    Ok(Duration::from_secs(secs as u64))
}
