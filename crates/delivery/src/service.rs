//! Delivery service: intake from fulfillment announcements and status
//! updates with propagation.

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, DeliveryId, OrderId};
use messaging::envelope::EventMessage;
use messaging::{MessageBus, subjects};

use crate::error::DeliveryError;
use crate::store::DeliveryStore;
use crate::types::{Delivery, DeliveryStatus};

/// Operations on delivery records.
///
/// Every successful status mutation emits a `DELIVERY_STATUS_UPDATE`
/// message; emission is best-effort and a publish failure never fails the
/// mutation.
#[derive(Clone)]
pub struct DeliveryService<D: DeliveryStore> {
    store: D,
    bus: Arc<dyn MessageBus>,
}

impl<D: DeliveryStore> DeliveryService<D> {
    pub fn new(store: D, bus: Arc<dyn MessageBus>) -> Self {
        Self { store, bus }
    }

    /// Creates a pending delivery for an order.
    ///
    /// Intake is idempotent per order id: a repeated announcement for the
    /// same order returns the existing delivery instead of creating a
    /// duplicate.
    #[tracing::instrument(skip(self, shipping_address), fields(%order_id))]
    pub async fn create_for_order(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        shipping_address: &str,
    ) -> Result<Delivery, DeliveryError> {
        if let Some(existing) = self.store.get_by_order(&order_id).await? {
            tracing::info!(
                delivery_id = %existing.id,
                "duplicate fulfillment announcement, keeping existing delivery"
            );
            return Ok(existing);
        }

        let delivery = Delivery::for_order(order_id, customer_id, shipping_address);
        self.store.insert(delivery.clone()).await?;

        metrics::counter!("deliveries_created_total").increment(1);
        tracing::info!(delivery_id = %delivery.id, "delivery created");
        Ok(delivery)
    }

    /// Moves a delivery to `target` and propagates the change.
    ///
    /// The transition is validated before any mutation; an invalid target
    /// leaves the record untouched.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: DeliveryId,
        target: DeliveryStatus,
    ) -> Result<Delivery, DeliveryError> {
        let delivery = self
            .store
            .get(&id)
            .await?
            .ok_or(DeliveryError::NotFound(id))?;

        if !delivery.status.can_transition_to(target) {
            return Err(DeliveryError::InvalidTransition {
                from: delivery.status,
                to: target,
            });
        }

        let now = Utc::now();
        self.store.update_status(&id, target, now).await?;
        metrics::counter!("delivery_status_updates_total").increment(1);

        let message = EventMessage::DeliveryStatusUpdate {
            order_id: delivery.order_id,
            status: target.as_str().to_string(),
            delivery_id: id,
            timestamp: now,
        };
        match serde_json::to_vec(&message) {
            Ok(bytes) => {
                if let Err(e) = self.bus.publish(subjects::DELIVERY_STATUS, bytes).await {
                    tracing::warn!(
                        delivery_id = %id,
                        error = %e,
                        "failed to propagate delivery status; order will lag"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize status update"),
        }

        Ok(Delivery {
            status: target,
            updated_at: now,
            ..delivery
        })
    }

    /// Looks up a delivery by ID.
    pub async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>, DeliveryError> {
        self.store.get(&id).await
    }

    /// Lists all deliveries.
    pub async fn list(&self) -> Result<Vec<Delivery>, DeliveryError> {
        self.store.list().await
    }
}
