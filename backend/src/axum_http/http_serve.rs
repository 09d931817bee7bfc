use crate::{
    axum_http::{default_routers, routers},
    config::config_model::{BackendServer, DotEnvyConfig},
    usecases::{
        bookings::BookingUseCase,
        payments::{PaymentGateway, PaymentUseCase},
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use hms::{
    domain::repositories::{
        bookings::BookingRepository, catalog::CatalogRepository, payments::PaymentRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            bookings::BookingPostgres, catalog::CatalogPostgres, payments::PaymentPostgres,
        },
    },
    notifications::{EventPublisher, NotificationDispatcher},
    payments::sslcommerz_client::SslCommerzClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

/// The full router with its middleware stack, independent of where the
/// repositories live.
pub fn app<B, C, P, G, N>(
    bookings_usecase: BookingUseCase<B, C, N>,
    payments_usecase: PaymentUseCase<P, B, G, N>,
    server: &BackendServer,
) -> Result<Router>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let body_limit: usize = (server.body_limit * 1024 * 1024).try_into()?;

    let router = Router::new()
        .fallback(default_routers::not_found)
        .nest("/bookings", routers::bookings::routes(bookings_usecase))
        .nest("/payments", routers::payments::routes(payments_usecase))
        .route("/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.timeout),
        ))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    publisher: Arc<NotificationDispatcher>,
) -> Result<()> {
    let booking_repository = Arc::new(BookingPostgres::new(Arc::clone(&db_pool)));
    let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));

    let gateway_config = &config.gateway;
    let gateway = SslCommerzClient::new(
        gateway_config.store_id.clone(),
        gateway_config.store_password.clone(),
        gateway_config.api_url.clone(),
        gateway_config.currency.clone(),
        gateway_config.base_url.clone(),
        gateway_config.timeout,
    )?;

    let bookings_usecase = BookingUseCase::new(
        Arc::clone(&booking_repository),
        catalog_repository,
        Arc::clone(&publisher),
    );
    let payments_usecase = PaymentUseCase::new(
        payment_repository,
        booking_repository,
        Arc::new(gateway),
        publisher,
        gateway_config.timeout,
    );

    let app = app(bookings_usecase, payments_usecase, &config.backend_server)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl+C signal"),
        Err(err) => {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    }
}
