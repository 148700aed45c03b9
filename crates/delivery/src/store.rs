//! Delivery storage trait and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{DeliveryId, OrderId};
use tokio::sync::RwLock;

use crate::error::DeliveryError;
use crate::types::{Delivery, DeliveryStatus};

/// Persistence seam for delivery records.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Looks up a delivery by ID.
    async fn get(&self, id: &DeliveryId) -> Result<Option<Delivery>, DeliveryError>;

    /// Looks up the delivery for an order, if any.
    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Delivery>, DeliveryError>;

    /// Inserts a new delivery.
    async fn insert(&self, delivery: Delivery) -> Result<(), DeliveryError>;

    /// Updates the status of an existing delivery.
    async fn update_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError>;

    /// Lists all deliveries in creation order.
    async fn list(&self) -> Result<Vec<Delivery>, DeliveryError>;
}

/// In-memory delivery store for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<Vec<Delivery>>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn get(&self, id: &DeliveryId) -> Result<Option<Delivery>, DeliveryError> {
        Ok(self
            .state
            .read()
            .await
            .iter()
            .find(|d| &d.id == id)
            .cloned())
    }

    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Delivery>, DeliveryError> {
        Ok(self
            .state
            .read()
            .await
            .iter()
            .find(|d| &d.order_id == order_id)
            .cloned())
    }

    async fn insert(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        self.state.write().await.push(delivery);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        let mut state = self.state.write().await;
        let delivery = state
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or(DeliveryError::NotFound(*id))?;
        delivery.status = status;
        delivery.updated_at = updated_at;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Delivery>, DeliveryError> {
        Ok(self.state.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CustomerId;

    #[tokio::test]
    async fn test_insert_get_and_list() {
        let store = InMemoryDeliveryStore::new();
        let delivery = Delivery::for_order(OrderId::new(), CustomerId::new(), "1 Main St");

        store.insert(delivery.clone()).await.unwrap();

        assert_eq!(store.get(&delivery.id).await.unwrap(), Some(delivery.clone()));
        assert_eq!(
            store.get_by_order(&delivery.order_id).await.unwrap(),
            Some(delivery.clone())
        );
        assert_eq!(store.list().await.unwrap(), vec![delivery]);
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = InMemoryDeliveryStore::new();
        let delivery = Delivery::for_order(OrderId::new(), CustomerId::new(), "1 Main St");
        store.insert(delivery.clone()).await.unwrap();

        store
            .update_status(&delivery.id, DeliveryStatus::InTransit, Utc::now())
            .await
            .unwrap();

        let loaded = store.get(&delivery.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DeliveryStatus::InTransit);
    }

    #[tokio::test]
    async fn test_update_missing_delivery_fails() {
        let store = InMemoryDeliveryStore::new();
        let err = store
            .update_status(&DeliveryId::new(), DeliveryStatus::Failed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));
    }
}
