//! PostgreSQL-backed delivery store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, DeliveryId, OrderId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::store::DeliveryStore;
use crate::types::{Delivery, DeliveryStatus};

/// Delivery store over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: Uuid,
    order_id: Uuid,
    customer_id: Uuid,
    shipping_address: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = DeliveryError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let status = DeliveryStatus::parse(&row.status)
            .ok_or_else(|| DeliveryError::Corrupt(format!("unknown status: {}", row.status)))?;
        Ok(Delivery {
            id: DeliveryId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            shipping_address: row.shipping_address,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT: &str = "SELECT id, order_id, customer_id, shipping_address, status, \
                      created_at, updated_at FROM deliveries";

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn get(&self, id: &DeliveryId) -> Result<Option<Delivery>, DeliveryError> {
        let row = sqlx::query_as::<_, DeliveryRow>(&format!("{SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Delivery::try_from).transpose()
    }

    async fn get_by_order(&self, order_id: &OrderId) -> Result<Option<Delivery>, DeliveryError> {
        let row = sqlx::query_as::<_, DeliveryRow>(&format!(
            "{SELECT} WHERE order_id = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Delivery::try_from).transpose()
    }

    async fn insert(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        sqlx::query(
            "INSERT INTO deliveries \
             (id, order_id, customer_id, shipping_address, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.order_id.as_uuid())
        .bind(delivery.customer_id.as_uuid())
        .bind(&delivery.shipping_address)
        .bind(delivery.status.as_str())
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        let result = sqlx::query(
            "UPDATE deliveries SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DeliveryError::NotFound(*id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Delivery>, DeliveryError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!("{SELECT} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Delivery::try_from).collect()
    }
}
