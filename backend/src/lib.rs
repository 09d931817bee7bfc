pub mod axum_http;
pub mod config;
pub mod usecases;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use hms::{
    infra::db::postgres::postgres_connection,
    notifications::{
        DispatchPolicy, NotificationDispatcher, NotificationSink,
        sinks::{LogSink, WebhookSink},
    },
};
use tracing::info;

/// How long queued notifications may keep delivering after the server stops.
const NOTIFY_DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Loads configuration, connects to Postgres, starts the notification worker
/// and serves HTTP until ctrl-c.
pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    hms::observability::init_observability("backend")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.pool_size,
    )?;
    info!("Postgres connection has been established");

    let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink)];
    if let Some(webhook_url) = dotenvy_env.notifications.webhook_url.clone() {
        sinks.push(Arc::new(WebhookSink::new(webhook_url)?));
        info!("Notification webhook enabled");
    }
    let policy = DispatchPolicy {
        capacity: dotenvy_env.notifications.queue_capacity,
        max_attempts: dotenvy_env.notifications.max_attempts,
        ..DispatchPolicy::default()
    };
    let (dispatcher, notify_worker) = NotificationDispatcher::spawn(sinks, policy);

    // `start` owns the last dispatcher handles; once it returns the queue is
    // closed and the worker only has to drain it.
    let served = axum_http::http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        Arc::new(dispatcher),
    )
    .await;

    let undelivered = notify_worker.shutdown(NOTIFY_DRAIN_GRACE).await;
    info!(undelivered, "Notification worker stopped");

    served
}
