//! The stock ledger service.

use std::collections::HashMap;
use std::sync::Arc;

use common::{OrderId, ProductId};
use messaging::envelope::{AvailabilityStatus, ItemQuantity};
use tokio::sync::Mutex;

use crate::error::InventoryError;
use crate::store::StockStore;
use crate::types::{Movement, MovementReason, MovementReceipt, StockRecord};

/// Availability / reserve / release over a [`StockStore`].
///
/// Mutations are serialized per product id: the per-product mutex is held
/// across the read-modify-write, so two concurrent reservations cannot both
/// observe the same quantity (see DESIGN.md on this concurrency choice).
///
/// Batch semantics: a failing item aborts the call, but items already
/// processed in the same call are NOT rolled back.
pub struct StockLedger<S: StockStore> {
    store: S,
    locks: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl<S: StockStore> StockLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn product_lock(&self, product_id: &ProductId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(product_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reports availability for each requested item.
    ///
    /// Pure read; items are independent, a missing product does not abort
    /// the batch.
    #[tracing::instrument(skip(self, items))]
    pub async fn check_availability(
        &self,
        items: &[ItemQuantity],
    ) -> Result<Vec<AvailabilityStatus>, InventoryError> {
        let mut statuses = Vec::with_capacity(items.len());

        for item in items {
            let status = match self.store.get(&item.product_id).await? {
                None => AvailabilityStatus::unavailable(item.product_id.clone(), None, "not found"),
                Some(record) if !record.active => AvailabilityStatus::unavailable(
                    item.product_id.clone(),
                    Some(record.quantity),
                    "inactive",
                ),
                Some(record) if record.quantity < item.quantity => {
                    AvailabilityStatus::unavailable(
                        item.product_id.clone(),
                        Some(record.quantity),
                        "insufficient stock",
                    )
                }
                Some(record) => {
                    AvailabilityStatus::available(item.product_id.clone(), record.quantity)
                }
            };
            statuses.push(status);
        }

        Ok(statuses)
    }

    /// Decrements stock for each item and appends a movement per item.
    ///
    /// Fails the whole call on the first missing or insufficient item;
    /// earlier items keep their decrements.
    #[tracing::instrument(skip(self, items), fields(%order_id))]
    pub async fn reserve(
        &self,
        order_id: OrderId,
        items: &[ItemQuantity],
    ) -> Result<Vec<MovementReceipt>, InventoryError> {
        let mut receipts = Vec::with_capacity(items.len());

        for item in items {
            let lock = self.product_lock(&item.product_id).await;
            let _guard = lock.lock().await;

            let record = self
                .store
                .get(&item.product_id)
                .await?
                .ok_or_else(|| InventoryError::ProductNotFound(item.product_id.clone()))?;

            if record.quantity < item.quantity {
                metrics::counter!("stock_reserve_failures_total").increment(1);
                return Err(InventoryError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available: record.quantity,
                });
            }

            let previous = record.quantity;
            let new = previous - item.quantity;
            receipts.push(
                self.apply(
                    record,
                    new,
                    -(item.quantity as i64),
                    MovementReason::ReservedForOrder,
                    order_id,
                )
                .await?,
            );
        }

        metrics::counter!("stock_reservations_total").increment(1);
        Ok(receipts)
    }

    /// Increments stock for each item and appends a movement per item.
    ///
    /// Fails with [`InventoryError::ProductNotFound`] if any referenced
    /// product is missing; earlier items keep their increments.
    #[tracing::instrument(skip(self, items), fields(%order_id))]
    pub async fn release(
        &self,
        order_id: OrderId,
        items: &[ItemQuantity],
    ) -> Result<Vec<MovementReceipt>, InventoryError> {
        let mut receipts = Vec::with_capacity(items.len());

        for item in items {
            let lock = self.product_lock(&item.product_id).await;
            let _guard = lock.lock().await;

            let record = self
                .store
                .get(&item.product_id)
                .await?
                .ok_or_else(|| InventoryError::ProductNotFound(item.product_id.clone()))?;

            let new = record.quantity + item.quantity;
            receipts.push(
                self.apply(
                    record,
                    new,
                    item.quantity as i64,
                    MovementReason::ReleasedFromCancelledOrder,
                    order_id,
                )
                .await?,
            );
        }

        metrics::counter!("stock_releases_total").increment(1);
        Ok(receipts)
    }

    async fn apply(
        &self,
        record: StockRecord,
        new_quantity: u32,
        delta: i64,
        reason: MovementReason,
        order_id: OrderId,
    ) -> Result<MovementReceipt, InventoryError> {
        let previous = record.quantity;
        let product_id = record.product_id.clone();

        self.store
            .put(StockRecord {
                quantity: new_quantity,
                ..record
            })
            .await?;
        self.store
            .append_movement(Movement::new(
                product_id.clone(),
                delta,
                previous,
                new_quantity,
                reason,
                order_id,
            ))
            .await?;

        tracing::debug!(%product_id, previous, new = new_quantity, delta, "stock moved");

        Ok(MovementReceipt {
            product_id,
            quantity: delta.unsigned_abs() as u32,
            previous_stock: previous,
            new_stock: new_quantity,
        })
    }
}
