//! Order endpoints: creation (with idempotent replay), lookup, and explicit
//! status transitions.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use common::{CustomerId, Money, OrderId, ProductId};
use delivery::DeliveryStore;
use idempotency::{IdempotencyKey, ResponseCache, StoredResponse};
use inventory::StockStore;
use sales::{LineRequest, Order, OrderStatus, OrderStore, PlaceOrder};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the client-supplied idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Header marking a replayed response.
pub const IDEMPOTENCY_REPLAYED_HEADER: &str = "idempotency-replayed";

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub shipping_address: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub items: Vec<OrderItemRequest>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub status: String,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub shipping_address: String,
    pub currency: String,
    pub status: String,
    pub total_cents: i64,
    pub items: Vec<OrderLineResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            shipping_address: order.shipping_address,
            currency: order.currency,
            status: order.status.to_string(),
            total_cents: order.total.cents(),
            items: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.line_total.cents(),
                })
                .collect(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — run the placement saga, deduplicated by idempotency key.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                ApiError::BadRequest("idempotency key must be valid UTF-8".to_string())
            })?;
            Some(IdempotencyKey::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?)
        }
        None => None,
    };

    if let Some(ref key) = key
        && let Some(stored) = state.idempotency.get(key).await
    {
        tracing::info!(%key, "replaying stored response");
        return replay_response(stored);
    }

    let customer_id = match req.customer_id.as_deref() {
        Some(raw) => {
            let uuid = uuid::Uuid::parse_str(raw)
                .map_err(|e| ApiError::BadRequest(format!("invalid customer_id: {e}")))?;
            CustomerId::from_uuid(uuid)
        }
        None => CustomerId::new(),
    };

    let lines = req
        .items
        .iter()
        .map(|item| LineRequest {
            product_id: ProductId::new(item.product_id.as_str()),
            quantity: item.quantity,
            unit_price: Money::from_cents(item.unit_price_cents),
        })
        .collect();

    let placed = state
        .coordinator
        .place_order(PlaceOrder {
            customer_id,
            shipping_address: req.shipping_address,
            currency: req.currency,
            lines,
        })
        .await?;

    let body = serde_json::to_vec(&OrderCreatedResponse {
        order_id: placed.order_id.to_string(),
        status: placed.status.to_string(),
        total_cents: placed.total.cents(),
    })
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    if let Some(key) = key {
        state
            .idempotency
            .put(
                key,
                StoredResponse {
                    status: StatusCode::CREATED.as_u16(),
                    headers: vec![(
                        header::CONTENT_TYPE.to_string(),
                        "application/json".to_string(),
                    )],
                    body: body.clone(),
                },
            )
            .await;
    }

    axum::http::Response::builder()
        .status(StatusCode::CREATED)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn replay_response(stored: StoredResponse) -> Result<Response, ApiError> {
    let mut builder = axum::http::Response::builder().status(stored.status);
    for (name, value) in &stored.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .header(IDEMPOTENCY_REPLAYED_HEADER, "true")
        .body(Body::from(stored.body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// GET /orders/{id} — load an order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state
        .coordinator
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.into()))
}

/// PATCH /orders/{id}/status — explicit state-machine transition.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let target = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid order status: {}", req.status)))?;

    let order = state.coordinator.transition_status(order_id, target).await?;
    Ok(Json(order.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
