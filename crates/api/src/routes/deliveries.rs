//! Delivery endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::DeliveryId;
use delivery::{Delivery, DeliveryStatus, DeliveryStore};
use inventory::StockStore;
use sales::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct DeliveryResponse {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub shipping_address: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        DeliveryResponse {
            id: delivery.id.to_string(),
            order_id: delivery.order_id.to_string(),
            customer_id: delivery.customer_id.to_string(),
            shipping_address: delivery.shipping_address,
            status: delivery.status.to_string(),
            created_at: delivery.created_at.to_rfc3339(),
            updated_at: delivery.updated_at.to_rfc3339(),
        }
    }
}

/// GET /deliveries — list all deliveries.
#[tracing::instrument(skip(state))]
pub async fn list<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
) -> Result<Json<Vec<DeliveryResponse>>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let deliveries = state.deliveries.list().await?;
    Ok(Json(deliveries.into_iter().map(Into::into).collect()))
}

/// GET /deliveries/{id} — load a delivery by ID.
#[tracing::instrument(skip(state))]
pub async fn get<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;
    let delivery = state
        .deliveries
        .get(delivery_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("delivery {id} not found")))?;

    Ok(Json(delivery.into()))
}

/// PATCH /deliveries/{id}/status — validated transition; every success
/// propagates a status message to the sales service.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<DeliveryResponse>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let delivery_id = parse_delivery_id(&id)?;

    // Invalid target values are rejected before any mutation.
    let target = DeliveryStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid delivery status: {}", req.status)))?;

    let delivery = state.deliveries.update_status(delivery_id, target).await?;
    Ok(Json(delivery.into()))
}

fn parse_delivery_id(id: &str) -> Result<DeliveryId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid delivery id: {e}")))?;
    Ok(DeliveryId::from_uuid(uuid))
}
