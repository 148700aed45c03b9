//! Queue consumers for the inventory service.

use std::sync::Arc;

use futures_util::StreamExt;
use messaging::envelope::{ReservationRequest, StockCheckRequest, StockCheckResponse};
use messaging::{DeadLetterQueue, MessageBus, MessagingError, subjects};

use crate::ledger::StockLedger;
use crate::store::StockStore;

/// Answers stock availability queries on the request queue.
pub struct StockCheckResponder<S: StockStore> {
    ledger: Arc<StockLedger<S>>,
    bus: Arc<dyn MessageBus>,
    dlq: DeadLetterQueue,
}

impl<S: StockStore + 'static> StockCheckResponder<S> {
    pub fn new(ledger: Arc<StockLedger<S>>, bus: Arc<dyn MessageBus>) -> Self {
        let dlq = DeadLetterQueue::new(bus.clone());
        Self { ledger, bus, dlq }
    }

    /// Consumes the request queue until the stream closes.
    pub async fn run(self) -> Result<(), MessagingError> {
        let mut requests = self.bus.subscribe(subjects::STOCK_CHECK_REQUEST).await?;
        tracing::info!(subject = subjects::STOCK_CHECK_REQUEST, "responder started");

        while let Some(payload) = requests.next().await {
            match serde_json::from_slice::<StockCheckRequest>(&payload) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    self.dlq
                        .push(subjects::STOCK_CHECK_REQUEST, &payload, &e.to_string())
                        .await;
                }
            }
        }
        Ok(())
    }

    async fn handle(&self, request: StockCheckRequest) {
        let statuses = match self.ledger.check_availability(&request.items).await {
            Ok(statuses) => statuses,
            Err(e) => {
                // No reply; the caller's deadline handles it.
                tracing::error!(
                    correlation_id = %request.correlation_id,
                    error = %e,
                    "availability check failed"
                );
                return;
            }
        };

        let unavailable: Vec<_> = statuses.iter().filter(|s| !s.available).cloned().collect();
        let response = StockCheckResponse {
            correlation_id: request.correlation_id,
            available: unavailable.is_empty(),
            items: statuses,
            unavailable_items: (!unavailable.is_empty()).then_some(unavailable),
        };

        match serde_json::to_vec(&response) {
            Ok(bytes) => {
                if let Err(e) = self.bus.publish(subjects::STOCK_CHECK_RESPONSE, bytes).await {
                    tracing::error!(error = %e, "failed to publish stock-check response");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize stock-check response"),
        }
    }
}

/// Applies one-way reservation requests to the ledger.
///
/// Failures are logged and not retried: by the time a reservation message
/// arrives the order is already persisted, and the saga does not compensate
/// (see DESIGN.md).
pub struct ReservationConsumer<S: StockStore> {
    ledger: Arc<StockLedger<S>>,
    bus: Arc<dyn MessageBus>,
    dlq: DeadLetterQueue,
}

impl<S: StockStore + 'static> ReservationConsumer<S> {
    pub fn new(ledger: Arc<StockLedger<S>>, bus: Arc<dyn MessageBus>) -> Self {
        let dlq = DeadLetterQueue::new(bus.clone());
        Self { ledger, bus, dlq }
    }

    /// Consumes the reservation queue until the stream closes.
    pub async fn run(self) -> Result<(), MessagingError> {
        let mut requests = self.bus.subscribe(subjects::STOCK_RESERVE).await?;
        tracing::info!(subject = subjects::STOCK_RESERVE, "reservation consumer started");

        while let Some(payload) = requests.next().await {
            let request: ReservationRequest = match serde_json::from_slice(&payload) {
                Ok(request) => request,
                Err(e) => {
                    self.dlq
                        .push(subjects::STOCK_RESERVE, &payload, &e.to_string())
                        .await;
                    continue;
                }
            };

            match self.ledger.reserve(request.order_id, &request.items).await {
                Ok(receipts) => {
                    tracing::info!(
                        order_id = %request.order_id,
                        items = receipts.len(),
                        "stock reserved"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %request.order_id,
                        error = %e,
                        "reservation failed; order remains unreserved"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStockStore;
    use crate::types::StockRecord;
    use common::{OrderId, ProductId};
    use messaging::InMemoryBus;
    use messaging::envelope::ItemQuantity;
    use uuid::Uuid;

    async fn setup(
        records: &[(&str, u32)],
    ) -> (Arc<dyn MessageBus>, Arc<StockLedger<InMemoryStockStore>>, InMemoryStockStore) {
        let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
        let store = InMemoryStockStore::new();
        for (sku, qty) in records {
            store.put(StockRecord::new(*sku, *qty)).await.unwrap();
        }
        let ledger = Arc::new(StockLedger::new(store.clone()));
        (bus, ledger, store)
    }

    #[tokio::test]
    async fn test_responder_reports_unavailable_items() {
        let (bus, ledger, _) = setup(&[("SKU-A", 10)]).await;
        let mut responses = bus.subscribe(subjects::STOCK_CHECK_RESPONSE).await.unwrap();

        tokio::spawn(StockCheckResponder::new(ledger, bus.clone()).run());

        let request = StockCheckRequest {
            correlation_id: Uuid::new_v4(),
            items: vec![
                ItemQuantity {
                    product_id: ProductId::new("SKU-A"),
                    quantity: 2,
                },
                ItemQuantity {
                    product_id: ProductId::new("SKU-MISSING"),
                    quantity: 1,
                },
            ],
        };
        bus.publish(
            subjects::STOCK_CHECK_REQUEST,
            serde_json::to_vec(&request).unwrap(),
        )
        .await
        .unwrap();

        let payload = responses.next().await.unwrap();
        let response: StockCheckResponse = serde_json::from_slice(&payload).unwrap();
        assert_eq!(response.correlation_id, request.correlation_id);
        assert!(!response.available);
        let unavailable = response.unavailable_items.unwrap();
        assert_eq!(unavailable.len(), 1);
        assert_eq!(unavailable[0].product_id, ProductId::new("SKU-MISSING"));
    }

    #[tokio::test]
    async fn test_reservation_consumer_applies_reservation() {
        let (bus, ledger, store) = setup(&[("SKU-A", 10)]).await;

        tokio::spawn(ReservationConsumer::new(ledger, bus.clone()).run());

        let request = ReservationRequest {
            order_id: OrderId::new(),
            items: vec![ItemQuantity {
                product_id: ProductId::new("SKU-A"),
                quantity: 4,
            }],
        };
        bus.publish(
            subjects::STOCK_RESERVE,
            serde_json::to_vec(&request).unwrap(),
        )
        .await
        .unwrap();

        // The consumer runs on its own task; poll until the write lands.
        for _ in 0..50 {
            if store.movement_count().await == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let record = store.get(&ProductId::new("SKU-A")).await.unwrap().unwrap();
        assert_eq!(record.quantity, 6);
    }

    #[tokio::test]
    async fn test_malformed_reservation_is_dead_lettered() {
        let (bus, ledger, store) = setup(&[("SKU-A", 10)]).await;
        let mut dlq = bus.subscribe(subjects::DEAD_LETTER).await.unwrap();

        tokio::spawn(ReservationConsumer::new(ledger, bus.clone()).run());

        bus.publish(subjects::STOCK_RESERVE, b"{not json".to_vec())
            .await
            .unwrap();

        let payload = dlq.next().await.unwrap();
        let entry: messaging::DeadLetter = serde_json::from_slice(&payload).unwrap();
        assert_eq!(entry.original_subject, subjects::STOCK_RESERVE);
        assert_eq!(store.movement_count().await, 0);
    }
}
