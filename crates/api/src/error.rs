//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use delivery::DeliveryError;
use inventory::InventoryError;
use messaging::envelope::AvailabilityStatus;
use sales::SalesError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Sales domain error.
    Sales(SalesError),
    /// Delivery domain error.
    Delivery(DeliveryError),
    /// Inventory domain error.
    Inventory(InventoryError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => simple(StatusCode::NOT_FOUND, &msg),
            ApiError::BadRequest(msg) => simple(StatusCode::BAD_REQUEST, &msg),
            ApiError::Sales(err) => sales_error_to_response(err),
            ApiError::Delivery(err) => delivery_error_to_response(err),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                simple(StatusCode::INTERNAL_SERVER_ERROR, &msg)
            }
        }
    }
}

fn simple(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, axum::Json(body)).into_response()
}

fn unavailable_items_response(items: Vec<AvailabilityStatus>) -> Response {
    let body = serde_json::json!({
        "error": "one or more items are unavailable",
        "unavailableItems": items,
    });
    (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
}

fn sales_error_to_response(err: SalesError) -> Response {
    match err {
        SalesError::ItemsUnavailable(items) => unavailable_items_response(items),
        err @ SalesError::OrderNotFound(_) => simple(StatusCode::NOT_FOUND, &err.to_string()),
        err @ (SalesError::NoLines
        | SalesError::InvalidQuantity { .. }
        | SalesError::InvalidTransition { .. }) => {
            simple(StatusCode::BAD_REQUEST, &err.to_string())
        }
        err => {
            tracing::error!(error = %err, "order processing failed");
            simple(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn delivery_error_to_response(err: DeliveryError) -> Response {
    match &err {
        DeliveryError::NotFound(_) => simple(StatusCode::NOT_FOUND, &err.to_string()),
        DeliveryError::InvalidTransition { .. } => {
            simple(StatusCode::BAD_REQUEST, &err.to_string())
        }
        DeliveryError::Database(_) | DeliveryError::Corrupt(_) => {
            tracing::error!(error = %err, "delivery operation failed");
            simple(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn inventory_error_to_response(err: InventoryError) -> Response {
    match &err {
        InventoryError::ProductNotFound(_) => simple(StatusCode::NOT_FOUND, &err.to_string()),
        InventoryError::InsufficientStock { .. } => {
            simple(StatusCode::BAD_REQUEST, &err.to_string())
        }
        InventoryError::Database(_) | InventoryError::Corrupt(_) => {
            tracing::error!(error = %err, "inventory operation failed");
            simple(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

impl From<SalesError> for ApiError {
    fn from(err: SalesError) -> Self {
        ApiError::Sales(err)
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        ApiError::Delivery(err)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}
