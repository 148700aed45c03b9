//! Delivery-status propagation consumer.

use std::sync::Arc;

use futures_util::StreamExt;
use messaging::envelope::EventMessage;
use messaging::{DeadLetterQueue, MessageBus, MessagingError, subjects};

use crate::error::SalesError;
use crate::order::OrderStatus;
use crate::store::OrderStore;

/// Applies `DELIVERY_STATUS_UPDATE` messages to orders.
///
/// The mapped status unconditionally overwrites the order's current status
/// (last message wins; there is no ordering or fencing token across
/// messages). Unknown message types are logged and dropped; unparseable
/// payloads and unknown status values are dead-lettered.
pub struct DeliveryStatusConsumer<O: OrderStore> {
    orders: O,
    bus: Arc<dyn MessageBus>,
    dlq: DeadLetterQueue,
}

impl<O: OrderStore + 'static> DeliveryStatusConsumer<O> {
    pub fn new(orders: O, bus: Arc<dyn MessageBus>) -> Self {
        let dlq = DeadLetterQueue::new(bus.clone());
        Self { orders, bus, dlq }
    }

    /// Consumes the status queue until the stream closes.
    pub async fn run(self) -> Result<(), MessagingError> {
        let mut updates = self.bus.subscribe(subjects::DELIVERY_STATUS).await?;
        tracing::info!(subject = subjects::DELIVERY_STATUS, "status consumer started");

        while let Some(payload) = updates.next().await {
            let message: EventMessage = match serde_json::from_slice(&payload) {
                Ok(message) => message,
                Err(e) => {
                    self.dlq
                        .push(subjects::DELIVERY_STATUS, &payload, &e.to_string())
                        .await;
                    continue;
                }
            };

            match message {
                EventMessage::DeliveryStatusUpdate {
                    order_id,
                    status,
                    delivery_id,
                    ..
                } => {
                    let Some(target) = OrderStatus::from_delivery_wire(&status) else {
                        self.dlq
                            .push(
                                subjects::DELIVERY_STATUS,
                                &payload,
                                &format!("unknown delivery status: {status}"),
                            )
                            .await;
                        continue;
                    };

                    match self.orders.set_status(&order_id, target).await {
                        Ok(()) => {
                            metrics::counter!("order_status_propagations_total").increment(1);
                            tracing::info!(
                                %order_id,
                                %delivery_id,
                                status = %target,
                                "order status updated from delivery"
                            );
                        }
                        Err(SalesError::OrderNotFound(_)) => {
                            tracing::warn!(%order_id, "status update for unknown order dropped");
                        }
                        Err(e) => {
                            tracing::error!(%order_id, error = %e, "failed to update order status");
                        }
                    }
                }
                other => {
                    tracing::warn!(?other, "ignoring unexpected message on status queue");
                }
            }
        }
        Ok(())
    }
}
