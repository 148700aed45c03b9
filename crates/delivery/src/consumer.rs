//! Fulfillment announcement consumer.

use std::sync::Arc;

use futures_util::StreamExt;
use messaging::envelope::EventMessage;
use messaging::{DeadLetterQueue, MessageBus, MessagingError, subjects};

use crate::service::DeliveryService;
use crate::store::DeliveryStore;

/// Creates deliveries from `ORDER_CREATED` announcements.
pub struct FulfillmentConsumer<D: DeliveryStore> {
    service: DeliveryService<D>,
    bus: Arc<dyn MessageBus>,
    dlq: DeadLetterQueue,
}

impl<D: DeliveryStore + 'static> FulfillmentConsumer<D> {
    pub fn new(service: DeliveryService<D>, bus: Arc<dyn MessageBus>) -> Self {
        let dlq = DeadLetterQueue::new(bus.clone());
        Self { service, bus, dlq }
    }

    /// Consumes the fulfillment queue until the stream closes.
    pub async fn run(self) -> Result<(), MessagingError> {
        let mut announcements = self.bus.subscribe(subjects::FULFILLMENT).await?;
        tracing::info!(subject = subjects::FULFILLMENT, "fulfillment consumer started");

        while let Some(payload) = announcements.next().await {
            let message: EventMessage = match serde_json::from_slice(&payload) {
                Ok(message) => message,
                Err(e) => {
                    self.dlq
                        .push(subjects::FULFILLMENT, &payload, &e.to_string())
                        .await;
                    continue;
                }
            };

            match message {
                EventMessage::OrderCreated {
                    order_id,
                    customer_id,
                    shipping_address,
                    ..
                } => {
                    if let Err(e) = self
                        .service
                        .create_for_order(order_id, customer_id, &shipping_address)
                        .await
                    {
                        tracing::error!(%order_id, error = %e, "failed to create delivery");
                    }
                }
                other => {
                    tracing::warn!(?other, "ignoring unexpected message on fulfillment queue");
                }
            }
        }
        Ok(())
    }
}
