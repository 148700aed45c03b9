//! Direct availability check endpoint on the inventory surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::ProductId;
use delivery::DeliveryStore;
use inventory::StockStore;
use messaging::envelope::{AvailabilityStatus, ItemQuantity};
use sales::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CheckAvailabilityRequest {
    pub items: Vec<CheckItemRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CheckAvailabilityResponse {
    /// True when every requested item is available.
    pub available: bool,
    pub items: Vec<AvailabilityStatus>,
}

/// POST /check-availability — per-item stock report, no side effects.
#[tracing::instrument(skip(state, req))]
pub async fn check<O, S, D>(
    State(state): State<Arc<AppState<O, S, D>>>,
    Json(req): Json<CheckAvailabilityRequest>,
) -> Result<Json<CheckAvailabilityResponse>, ApiError>
where
    O: OrderStore + 'static,
    S: StockStore + 'static,
    D: DeliveryStore + 'static,
{
    let items: Vec<ItemQuantity> = req
        .items
        .iter()
        .map(|item| ItemQuantity {
            product_id: ProductId::new(item.product_id.as_str()),
            quantity: item.quantity,
        })
        .collect();

    let statuses = state.ledger.check_availability(&items).await?;
    let available = statuses.iter().all(|s| s.available);

    Ok(Json(CheckAvailabilityResponse {
        available,
        items: statuses,
    }))
}
