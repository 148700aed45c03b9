//! PostgreSQL-backed stock store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InventoryError;
use crate::store::StockStore;
use crate::types::{Movement, MovementReason, StockRecord};

/// Stock store over a PostgreSQL pool.
///
/// Rows map 1:1 onto [`StockRecord`] and [`Movement`]; serialization of
/// concurrent mutations is the ledger's job, so queries here stay plain.
#[derive(Clone)]
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StockRow {
    product_id: String,
    quantity: i64,
    active: bool,
}

impl TryFrom<StockRow> for StockRecord {
    type Error = InventoryError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| InventoryError::Corrupt(format!("negative stock: {}", row.quantity)))?;
        Ok(StockRecord {
            product_id: ProductId::new(row.product_id),
            quantity,
            active: row.active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: String,
    delta: i64,
    previous_quantity: i64,
    new_quantity: i64,
    reason: String,
    order_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = InventoryError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let reason = MovementReason::parse(&row.reason)
            .ok_or_else(|| InventoryError::Corrupt(format!("unknown reason: {}", row.reason)))?;
        let previous_quantity = u32::try_from(row.previous_quantity)
            .map_err(|_| InventoryError::Corrupt("negative previous quantity".to_string()))?;
        let new_quantity = u32::try_from(row.new_quantity)
            .map_err(|_| InventoryError::Corrupt("negative new quantity".to_string()))?;

        Ok(Movement {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            delta: row.delta,
            previous_quantity,
            new_quantity,
            reason,
            order_id: OrderId::from_uuid(row.order_id),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn get(&self, product_id: &ProductId) -> Result<Option<StockRecord>, InventoryError> {
        let row = sqlx::query_as::<_, StockRow>(
            "SELECT product_id, quantity, active FROM stock_records WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(StockRecord::try_from).transpose()
    }

    async fn put(&self, record: StockRecord) -> Result<(), InventoryError> {
        sqlx::query(
            "INSERT INTO stock_records (product_id, quantity, active) VALUES ($1, $2, $3) \
             ON CONFLICT (product_id) \
             DO UPDATE SET quantity = EXCLUDED.quantity, active = EXCLUDED.active",
        )
        .bind(record.product_id.as_str())
        .bind(record.quantity as i64)
        .bind(record.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_movement(&self, movement: Movement) -> Result<(), InventoryError> {
        sqlx::query(
            "INSERT INTO stock_movements \
             (id, product_id, delta, previous_quantity, new_quantity, reason, order_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(movement.id)
        .bind(movement.product_id.as_str())
        .bind(movement.delta)
        .bind(movement.previous_quantity as i64)
        .bind(movement.new_quantity as i64)
        .bind(movement.reason.as_str())
        .bind(movement.order_id.as_uuid())
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn movements_for(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Movement>, InventoryError> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT id, product_id, delta, previous_quantity, new_quantity, reason, order_id, created_at \
             FROM stock_movements WHERE product_id = $1 ORDER BY seq",
        )
        .bind(product_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }
}
