//! The order fulfillment saga coordinator.

use std::sync::Arc;

use common::{CustomerId, Money, OrderId, ProductId};
use messaging::envelope::{EventMessage, ItemQuantity, ReservationRequest};
use messaging::{MessageBus, subjects};

use crate::availability::AvailabilityChecker;
use crate::error::SalesError;
use crate::order::{Order, OrderLine, OrderStatus};
use crate::store::OrderStore;

/// A requested order line.
#[derive(Debug, Clone)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Input to the saga.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub shipping_address: String,
    pub currency: String,
    pub lines: Vec<LineRequest>,
}

/// Terminal success result of the saga.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Money,
}

/// Drives the order placement saga.
///
/// Four sequential steps, no distributed transaction, each with its own
/// failure policy:
///
/// 1. availability check — any unavailable line aborts before anything is
///    persisted; an RPC failure aborts too.
/// 2. persist order + lines — a store failure aborts.
/// 3. publish the reservation request — fire-and-forget; a publish failure
///    is logged and the order stands unreserved.
/// 4. publish the fulfillment announcement — fire-and-forget; a publish
///    failure is logged and the order stands without a delivery.
///
/// Committed steps are never compensated when a later step fails; the
/// system converges through status propagation, not rollback.
pub struct FulfillmentCoordinator<O: OrderStore, A: AvailabilityChecker> {
    orders: O,
    checker: A,
    bus: Arc<dyn MessageBus>,
}

impl<O: OrderStore, A: AvailabilityChecker> FulfillmentCoordinator<O, A> {
    pub fn new(orders: O, checker: A, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            orders,
            checker,
            bus,
        }
    }

    /// Executes the saga for one order request.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<PlacedOrder, SalesError> {
        metrics::counter!("orders_attempted_total").increment(1);
        let saga_start = std::time::Instant::now();

        if request.lines.is_empty() {
            return Err(SalesError::NoLines);
        }
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(SalesError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }
        }

        let items: Vec<ItemQuantity> = request
            .lines
            .iter()
            .map(|line| ItemQuantity {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            })
            .collect();

        // Step 1: availability. Nothing is persisted before this passes.
        let statuses = self.checker.check(&items).await?;
        let unavailable: Vec<_> = statuses.into_iter().filter(|s| !s.available).collect();
        if !unavailable.is_empty() {
            metrics::counter!("orders_rejected_unavailable_total").increment(1);
            tracing::info!(items = unavailable.len(), "order rejected, items unavailable");
            return Err(SalesError::ItemsUnavailable(unavailable));
        }

        // Step 2: persist order and lines.
        let lines: Vec<OrderLine> = request
            .lines
            .iter()
            .map(|line| OrderLine::new(line.product_id.clone(), line.quantity, line.unit_price))
            .collect();
        let shipping_address = request.shipping_address;
        let order = Order::create(
            request.customer_id,
            shipping_address.clone(),
            request.currency,
            lines,
        );
        let order_id = order.id;
        let placed = PlacedOrder {
            order_id,
            status: order.status,
            total: order.total,
        };
        let created_at = order.created_at;
        self.orders.insert(order).await?;
        tracing::info!(%order_id, "order persisted");

        // Step 3: reservation, one-way. Not compensated on failure.
        let reservation = ReservationRequest {
            order_id,
            items: items.clone(),
        };
        self.publish_best_effort(subjects::STOCK_RESERVE, &reservation, "reservation")
            .await;

        // Step 4: fulfillment announcement, one-way. The order exists
        // without a delivery if this fails.
        let announcement = EventMessage::OrderCreated {
            order_id,
            customer_id: request.customer_id,
            shipping_address,
            items,
            total_amount: placed.total.cents(),
            created_at,
        };
        self.publish_best_effort(subjects::FULFILLMENT, &announcement, "fulfillment announcement")
            .await;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        Ok(placed)
    }

    async fn publish_best_effort<T: serde::Serialize>(
        &self,
        subject: &str,
        message: &T,
        what: &str,
    ) {
        let bytes = match serde_json::to_vec(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, what, "failed to serialize message");
                return;
            }
        };
        if let Err(e) = self.bus.publish(subject, bytes).await {
            tracing::warn!(error = %e, what, "publish failed; continuing without it");
        }
    }

    /// Looks up an order by ID.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, SalesError> {
        self.orders.get(&id).await
    }

    /// Applies an explicit status transition, validated against the order
    /// state machine.
    #[tracing::instrument(skip(self))]
    pub async fn transition_status(
        &self,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, SalesError> {
        let order = self
            .orders
            .get(&id)
            .await?
            .ok_or(SalesError::OrderNotFound(id))?;

        if !order.status.can_transition_to(target) {
            return Err(SalesError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        self.orders.set_status(&id, target).await?;
        Ok(Order {
            status: target,
            ..order
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::StaticAvailabilityChecker;
    use crate::store::InMemoryOrderStore;
    use futures_util::StreamExt;
    use messaging::InMemoryBus;

    fn request(lines: Vec<LineRequest>) -> PlaceOrder {
        PlaceOrder {
            customer_id: CustomerId::new(),
            shipping_address: "1 Main St".to_string(),
            currency: "USD".to_string(),
            lines,
        }
    }

    fn line(sku: &str, quantity: u32, cents: i64) -> LineRequest {
        LineRequest {
            product_id: ProductId::new(sku),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    fn coordinator(
        checker: StaticAvailabilityChecker,
    ) -> (
        FulfillmentCoordinator<InMemoryOrderStore, StaticAvailabilityChecker>,
        InMemoryOrderStore,
        Arc<dyn MessageBus>,
    ) {
        let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
        let orders = InMemoryOrderStore::new();
        (
            FulfillmentCoordinator::new(orders.clone(), checker, bus.clone()),
            orders,
            bus,
        )
    }

    #[tokio::test]
    async fn test_happy_path_persists_and_announces() {
        let (coordinator, orders, bus) = coordinator(StaticAvailabilityChecker::all_available());
        let mut reserve = bus.subscribe(subjects::STOCK_RESERVE).await.unwrap();
        let mut fulfillment = bus.subscribe(subjects::FULFILLMENT).await.unwrap();

        let placed = coordinator
            .place_order(request(vec![
                line("SKU-001", 2, 1000),
                line("SKU-002", 1, 2500),
            ]))
            .await
            .unwrap();

        assert_eq!(placed.status, OrderStatus::PendingShipment);
        assert_eq!(placed.total.cents(), 4500);
        assert_eq!(orders.order_count().await, 1);

        let reservation: ReservationRequest =
            serde_json::from_slice(&reserve.next().await.unwrap()).unwrap();
        assert_eq!(reservation.order_id, placed.order_id);
        assert_eq!(reservation.items.len(), 2);

        let message: EventMessage =
            serde_json::from_slice(&fulfillment.next().await.unwrap()).unwrap();
        match message {
            EventMessage::OrderCreated {
                order_id,
                total_amount,
                shipping_address,
                ..
            } => {
                assert_eq!(order_id, placed.order_id);
                assert_eq!(total_amount, 4500);
                assert_eq!(shipping_address, "1 Main St");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_line_aborts_with_nothing_persisted() {
        let (coordinator, orders, bus) = coordinator(StaticAvailabilityChecker::with_unavailable(
            [ProductId::new("SKU-002")],
        ));
        let mut reserve = bus.subscribe(subjects::STOCK_RESERVE).await.unwrap();

        let err = coordinator
            .place_order(request(vec![
                line("SKU-001", 1, 1000),
                line("SKU-002", 1, 2000),
            ]))
            .await
            .unwrap_err();

        match err {
            SalesError::ItemsUnavailable(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].product_id, ProductId::new("SKU-002"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(orders.order_count().await, 0);
        // No reservation was published either.
        bus.publish(subjects::STOCK_RESERVE, b"sentinel".to_vec())
            .await
            .unwrap();
        assert_eq!(reserve.next().await.unwrap(), b"sentinel");
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let (coordinator, orders, _bus) = coordinator(StaticAvailabilityChecker::all_available());

        let err = coordinator.place_order(request(vec![])).await.unwrap_err();
        assert!(matches!(err, SalesError::NoLines));
        assert_eq!(orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (coordinator, orders, _bus) = coordinator(StaticAvailabilityChecker::all_available());

        let err = coordinator
            .place_order(request(vec![line("SKU-001", 0, 1000)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::InvalidQuantity { .. }));
        assert_eq!(orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_announcement_publish_failure_does_not_fail_order() {
        let (coordinator, orders, bus) = coordinator(StaticAvailabilityChecker::all_available());

        // Attach and drop the fulfillment consumer so the publish fails.
        drop(bus.subscribe(subjects::FULFILLMENT).await.unwrap());

        let placed = coordinator
            .place_order(request(vec![line("SKU-001", 1, 1000)]))
            .await
            .unwrap();
        assert_eq!(orders.order_count().await, 1);
        assert_eq!(placed.status, OrderStatus::PendingShipment);
    }

    #[tokio::test]
    async fn test_transition_status_validates_state_machine() {
        let (coordinator, _orders, _bus) = coordinator(StaticAvailabilityChecker::all_available());

        let placed = coordinator
            .place_order(request(vec![line("SKU-001", 1, 1000)]))
            .await
            .unwrap();

        let shipped = coordinator
            .transition_status(placed.order_id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        // Cancellation is only reachable from PendingShipment.
        let err = coordinator
            .transition_status(placed.order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let (coordinator, _orders, _bus) = coordinator(StaticAvailabilityChecker::all_available());
        let err = coordinator
            .transition_status(OrderId::new(), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::OrderNotFound(_)));
    }
}
