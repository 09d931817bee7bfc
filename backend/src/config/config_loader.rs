use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use hms::payments::sslcommerz_client::SANDBOX_API_URL;
use tracing::warn;
use url::Url;

use super::config_model::{BackendServer, Database, DotEnvyConfig, Gateway, Notifications};

pub const MIN_GATEWAY_TIMEOUT_SECS: u64 = 10;
pub const MAX_GATEWAY_TIMEOUT_SECS: u64 = 30;
/// Request budget kept on top of the gateway call for the surrounding DB work.
pub const SERVER_TIMEOUT_HEADROOM_SECS: u64 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let mut backend_server = BackendServer {
        port: env.parsed("SERVER_PORT")?,
        body_limit: env.parsed_or("SERVER_BODY_LIMIT", 10)?,
        timeout: env.parsed_or("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: env.required("DATABASE_URL")?,
        pool_size: env.parsed_or("DATABASE_POOL_SIZE", 10)?,
    };

    let api_url = env
        .optional("SSL_API_URL")
        .unwrap_or_else(|| SANDBOX_API_URL.to_string());
    let timeout_secs: u64 = env.parsed_or("SSL_TIMEOUT_SECS", 20)?;

    let gateway = Gateway {
        store_id: env.required("SSL_STORE_ID")?,
        store_password: env.required("SSL_STORE_PASSWORD")?,
        api_url: Url::parse(&api_url).context("SSL_API_URL is not a valid URL")?,
        currency: env
            .optional("SSL_CURRENCY")
            .unwrap_or_else(|| "BDT".to_string()),
        base_url: env.required("BASE_URL")?,
        timeout: Duration::from_secs(clamp_gateway_timeout(timeout_secs)),
    };

    backend_server.timeout = server_timeout_over_gateway(backend_server.timeout, &gateway);

    let webhook_url = match env.optional("NOTIFY_WEBHOOK_URL") {
        Some(raw) => Some(Url::parse(&raw).context("NOTIFY_WEBHOOK_URL is not a valid URL")?),
        None => None,
    };

    let notifications = Notifications {
        webhook_url,
        queue_capacity: env.parsed_or("NOTIFY_QUEUE_CAPACITY", 256)?,
        max_attempts: env.parsed_or("NOTIFY_MAX_ATTEMPTS", 3)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        gateway,
        notifications,
    })
}

fn clamp_gateway_timeout(secs: u64) -> u64 {
    let clamped = secs.clamp(MIN_GATEWAY_TIMEOUT_SECS, MAX_GATEWAY_TIMEOUT_SECS);
    if clamped != secs {
        warn!(
            requested = secs,
            applied = clamped,
            "config: SSL_TIMEOUT_SECS out of range; clamped"
        );
    }
    clamped
}

/// The request timeout must outlast the gateway call, or a slow gateway
/// surfaces as 408 instead of a gateway error.
fn server_timeout_over_gateway(server_secs: u64, gateway: &Gateway) -> u64 {
    let floor = gateway.timeout.as_secs() + SERVER_TIMEOUT_HEADROOM_SECS;
    if server_secs < floor {
        warn!(
            requested = server_secs,
            applied = floor,
            "config: SERVER_TIMEOUT shorter than gateway timeout plus headroom; raised"
        );
        return floor;
    }
    server_secs
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| anyhow!("{key} is not set"))
    }

    fn parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.required(key)?;
        raw.parse()
            .map_err(|err| anyhow!("{key} is invalid ({raw}): {err}"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(_) => self.parsed(key),
            None => Ok(default),
        }
    }
}
