//! Stock storage trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::error::InventoryError;
use crate::types::{Movement, StockRecord};

/// Persistence seam for stock records and their movement trail.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Looks up the stock record for a product.
    async fn get(&self, product_id: &ProductId) -> Result<Option<StockRecord>, InventoryError>;

    /// Inserts or replaces a stock record.
    async fn put(&self, record: StockRecord) -> Result<(), InventoryError>;

    /// Appends a movement to the audit trail. Movements are never updated
    /// or deleted.
    async fn append_movement(&self, movement: Movement) -> Result<(), InventoryError>;

    /// Returns all movements for a product in creation order.
    async fn movements_for(&self, product_id: &ProductId)
    -> Result<Vec<Movement>, InventoryError>;
}

#[derive(Default)]
struct InMemoryState {
    records: HashMap<ProductId, StockRecord>,
    movements: Vec<Movement>,
}

/// In-memory stock store for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStockStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of movements across all products.
    pub async fn movement_count(&self) -> usize {
        self.state.read().await.movements.len()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn get(&self, product_id: &ProductId) -> Result<Option<StockRecord>, InventoryError> {
        Ok(self.state.read().await.records.get(product_id).cloned())
    }

    async fn put(&self, record: StockRecord) -> Result<(), InventoryError> {
        self.state
            .write()
            .await
            .records
            .insert(record.product_id.clone(), record);
        Ok(())
    }

    async fn append_movement(&self, movement: Movement) -> Result<(), InventoryError> {
        self.state.write().await.movements.push(movement);
        Ok(())
    }

    async fn movements_for(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Movement>, InventoryError> {
        Ok(self
            .state
            .read()
            .await
            .movements
            .iter()
            .filter(|m| &m.product_id == product_id)
            .cloned()
            .collect())
    }
}
