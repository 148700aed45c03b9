//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use messaging::{InMemoryBus, MessageBus, NatsBus};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(app: axum::Router, addr: String) {
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect the bus. Broker connectivity is required to accept orders,
    //    so a configured-but-unreachable broker is fatal here.
    let bus: Arc<dyn MessageBus> = match &config.nats_url {
        Some(url) => Arc::new(
            NatsBus::connect(url)
                .await
                .expect("broker connection failed at startup"),
        ),
        None => {
            tracing::info!("NATS_URL not set, using in-process bus");
            Arc::new(InMemoryBus::new())
        }
    };

    // 4. Wire state and run
    let addr = config.addr();
    match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .expect("database connection failed at startup");
            let state = api::create_pg_state(bus, pool)
                .await
                .expect("failed to wire services");
            serve(api::create_app(state, metrics_handle), addr).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            let (state, _stock, _orders) = api::create_default_state(bus)
                .await
                .expect("failed to wire services");
            serve(api::create_app(state, metrics_handle), addr).await;
        }
    }
}
