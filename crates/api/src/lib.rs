//! HTTP API and service wiring for the order fulfillment system.
//!
//! One axum application mounts all three service surfaces. The services
//! talk to each other only through the message bus, so the same wiring runs
//! against the in-process bus (tests, local runs) or NATS (deployments).

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use delivery::{
    DeliveryService, DeliveryStore, FulfillmentConsumer, InMemoryDeliveryStore, PgDeliveryStore,
};
use idempotency::InMemoryResponseCache;
use inventory::{
    InMemoryStockStore, PgStockStore, ReservationConsumer, StockCheckResponder, StockLedger,
    StockStore,
};
use messaging::rpc::DEFAULT_RPC_TIMEOUT;
use messaging::{MessageBus, MessagingError};
use metrics_exporter_prometheus::PrometheusHandle;
use sales::{
    DeliveryStatusConsumer, FulfillmentCoordinator, InMemoryOrderStore, OrderStore, PgOrderStore,
    RpcAvailabilityChecker,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<O: OrderStore, S: StockStore, D: DeliveryStore> {
    pub coordinator: FulfillmentCoordinator<O, RpcAvailabilityChecker>,
    pub ledger: Arc<StockLedger<S>>,
    pub deliveries: DeliveryService<D>,
    pub idempotency: InMemoryResponseCache,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, S, D>(
    state: Arc<AppState<O, S, D>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<O, S, D>))
        .route("/orders/{id}", get(routes::orders::get::<O, S, D>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<O, S, D>),
        )
        .route(
            "/check-availability",
            post(routes::availability::check::<O, S, D>),
        )
        .route("/deliveries", get(routes::deliveries::list::<O, S, D>))
        .route("/deliveries/{id}", get(routes::deliveries::get::<O, S, D>))
        .route(
            "/deliveries/{id}/status",
            patch(routes::deliveries::update_status::<O, S, D>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the coordinator, consumers, and RPC checker over the given stores
/// and bus.
///
/// The queue consumers run as background tasks for the life of the process.
pub async fn create_state<O, S, D>(
    orders: O,
    stock: S,
    deliveries: D,
    bus: Arc<dyn MessageBus>,
) -> Result<Arc<AppState<O, S, D>>, MessagingError>
where
    O: OrderStore + Clone + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + Clone + 'static,
{
    let ledger = Arc::new(StockLedger::new(stock));
    spawn_consumer(
        "stock_check_responder",
        StockCheckResponder::new(ledger.clone(), bus.clone()).run(),
    );
    spawn_consumer(
        "reservation_consumer",
        ReservationConsumer::new(ledger.clone(), bus.clone()).run(),
    );

    let delivery_service = DeliveryService::new(deliveries, bus.clone());
    spawn_consumer(
        "fulfillment_consumer",
        FulfillmentConsumer::new(delivery_service.clone(), bus.clone()).run(),
    );
    spawn_consumer(
        "delivery_status_consumer",
        DeliveryStatusConsumer::new(orders.clone(), bus.clone()).run(),
    );

    let checker = RpcAvailabilityChecker::start(bus.clone(), DEFAULT_RPC_TIMEOUT).await?;
    let coordinator = FulfillmentCoordinator::new(orders, checker, bus);

    Ok(Arc::new(AppState {
        coordinator,
        ledger,
        deliveries: delivery_service,
        idempotency: InMemoryResponseCache::new(),
    }))
}

fn spawn_consumer<F>(name: &'static str, task: F)
where
    F: Future<Output = Result<(), MessagingError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!(consumer = name, error = %e, "consumer terminated");
        }
    });
}

/// In-memory backends for tests and local runs.
///
/// Returns the stock and order store handles so callers can seed stock and
/// observe persistence directly.
pub async fn create_default_state(
    bus: Arc<dyn MessageBus>,
) -> Result<
    (
        Arc<AppState<InMemoryOrderStore, InMemoryStockStore, InMemoryDeliveryStore>>,
        InMemoryStockStore,
        InMemoryOrderStore,
    ),
    MessagingError,
> {
    let orders = InMemoryOrderStore::new();
    let stock = InMemoryStockStore::new();
    let deliveries = InMemoryDeliveryStore::new();

    let state = create_state(orders.clone(), stock.clone(), deliveries, bus).await?;
    Ok((state, stock, orders))
}

/// PostgreSQL backends over one shared pool.
pub async fn create_pg_state(
    bus: Arc<dyn MessageBus>,
    pool: sqlx::PgPool,
) -> Result<Arc<AppState<PgOrderStore, PgStockStore, PgDeliveryStore>>, MessagingError> {
    create_state(
        PgOrderStore::new(pool.clone()),
        PgStockStore::new(pool.clone()),
        PgDeliveryStore::new(pool),
        bus,
    )
    .await
}
