//! PostgreSQL-backed order store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::SalesError;
use crate::order::{Order, OrderLine, OrderStatus};
use crate::store::OrderStore;

/// Order store over a PostgreSQL pool.
///
/// The order header and its lines are written in one transaction, matching
/// the atomic-creation requirement.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    shipping_address: String,
    total_cents: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
}

impl TryFrom<LineRow> for OrderLine {
    type Error = SalesError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| SalesError::Corrupt(format!("bad line quantity: {}", row.quantity)))?;
        Ok(OrderLine {
            product_id: ProductId::new(row.product_id),
            quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            line_total: Money::from_cents(row.line_total_cents),
        })
    }
}

fn order_from_rows(row: OrderRow, lines: Vec<LineRow>) -> Result<Order, SalesError> {
    let status = OrderStatus::parse(&row.status)
        .ok_or_else(|| SalesError::Corrupt(format!("unknown status: {}", row.status)))?;
    let lines = lines
        .into_iter()
        .map(OrderLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Order {
        id: OrderId::from_uuid(row.id),
        customer_id: CustomerId::from_uuid(row.customer_id),
        shipping_address: row.shipping_address,
        total: Money::from_cents(row.total_cents),
        currency: row.currency,
        status,
        lines,
        created_at: row.created_at,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: Order) -> Result<(), SalesError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders \
             (id, customer_id, shipping_address, total_cents, currency, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(&order.shipping_address)
        .bind(order.total.cents())
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines \
                 (order_id, product_id, quantity, unit_price_cents, line_total_cents) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(line.quantity as i64)
            .bind(line.unit_price.cents())
            .bind(line.line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, SalesError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, customer_id, shipping_address, total_cents, currency, status, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, LineRow>(
            "SELECT product_id, quantity, unit_price_cents, line_total_cents \
             FROM order_lines WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        order_from_rows(row, lines).map(Some)
    }

    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), SalesError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SalesError::OrderNotFound(*id));
        }
        Ok(())
    }
}
