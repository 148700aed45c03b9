//! Order storage trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::error::SalesError;
use crate::order::{Order, OrderStatus};

/// Persistence seam for orders and their lines.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order together with its lines.
    async fn insert(&self, order: Order) -> Result<(), SalesError>;

    /// Looks up an order by ID.
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, SalesError>;

    /// Overwrites the status of an existing order.
    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), SalesError>;
}

/// In-memory order store for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), SalesError> {
        self.state.write().await.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, SalesError> {
        Ok(self.state.read().await.get(id).cloned())
    }

    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), SalesError> {
        let mut state = self.state.write().await;
        let order = state.get_mut(id).ok_or(SalesError::OrderNotFound(*id))?;
        order.status = status;
        Ok(())
    }
}
