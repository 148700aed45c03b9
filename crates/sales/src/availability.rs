//! Availability checking seam.
//!
//! The saga always validates availability through the correlated-RPC queue
//! pattern; [`StaticAvailabilityChecker`] is the in-process double for
//! tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use messaging::envelope::{AvailabilityStatus, ItemQuantity, StockCheckRequest, StockCheckResponse};
use messaging::{MessageBus, MessagingError, RpcClient, subjects};
use uuid::Uuid;

use crate::error::SalesError;

/// Answers "can these items be supplied right now?".
#[async_trait]
pub trait AvailabilityChecker: Send + Sync {
    /// Returns a per-item availability report.
    async fn check(&self, items: &[ItemQuantity]) -> Result<Vec<AvailabilityStatus>, SalesError>;
}

/// Availability checks over the stock-check request/response queues.
pub struct RpcAvailabilityChecker {
    rpc: RpcClient<StockCheckResponse>,
}

impl RpcAvailabilityChecker {
    /// Subscribes the reply consumer and returns a ready checker.
    pub async fn start(
        bus: Arc<dyn MessageBus>,
        timeout: Duration,
    ) -> Result<Self, MessagingError> {
        let rpc = RpcClient::start(
            bus,
            subjects::STOCK_CHECK_REQUEST,
            subjects::STOCK_CHECK_RESPONSE,
            timeout,
        )
        .await?;
        Ok(Self { rpc })
    }
}

#[async_trait]
impl AvailabilityChecker for RpcAvailabilityChecker {
    async fn check(&self, items: &[ItemQuantity]) -> Result<Vec<AvailabilityStatus>, SalesError> {
        let correlation_id = Uuid::new_v4();
        let request = StockCheckRequest {
            correlation_id,
            items: items.to_vec(),
        };

        let response = self
            .rpc
            .call(correlation_id, &request)
            .await
            .map_err(|e| SalesError::AvailabilityCheck(e.to_string()))?;

        Ok(response.items)
    }
}

/// Fixed-answer checker for tests: listed products are reported short,
/// everything else is available.
#[derive(Clone, Default)]
pub struct StaticAvailabilityChecker {
    unavailable: HashSet<ProductId>,
}

impl StaticAvailabilityChecker {
    /// A checker that reports every item available.
    pub fn all_available() -> Self {
        Self::default()
    }

    /// A checker that reports the given products as out of stock.
    pub fn with_unavailable(products: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            unavailable: products.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AvailabilityChecker for StaticAvailabilityChecker {
    async fn check(&self, items: &[ItemQuantity]) -> Result<Vec<AvailabilityStatus>, SalesError> {
        Ok(items
            .iter()
            .map(|item| {
                if self.unavailable.contains(&item.product_id) {
                    AvailabilityStatus::unavailable(
                        item.product_id.clone(),
                        Some(0),
                        "insufficient stock",
                    )
                } else {
                    AvailabilityStatus::available(item.product_id.clone(), u32::MAX)
                }
            })
            .collect())
    }
}
