//! PostgreSQL-backed projection store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::EventId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{ProjectionError, Result};
use crate::read_model::{OrderProjection, ProcessedEventMarker};
use crate::store::ProjectionStore;

/// PostgreSQL implementation of [`ProjectionStore`].
#[derive(Clone)]
pub struct PostgresProjectionStore {
    pool: PgPool,
}

impl PostgresProjectionStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(ProjectionError::from)
    }

    fn row_to_projection(row: PgRow) -> Result<OrderProjection> {
        Ok(OrderProjection {
            order_id: row.try_get("order_id")?,
            customer_id: row.try_get("customer_id")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            source_system: row.try_get("source_system")?,
            last_event_version: row.try_get("last_event_version")?,
            last_event_id: EventId::from_uuid(row.try_get::<Uuid, _>("last_event_id")?),
        })
    }
}

#[async_trait]
impl ProjectionStore for PostgresProjectionStore {
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderProjection>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, customer_id, amount, currency, created_at, updated_at,
                   source_system, last_event_version, last_event_id
            FROM order_projections
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_projection).transpose()
    }

    async fn upsert_if_unprocessed(
        &self,
        projection: OrderProjection,
        marker: ProcessedEventMarker,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let already_processed: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(marker.event_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;

        if already_processed {
            return Ok(false);
        }

        let marker_insert = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, version, partition_id, "offset", processed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(marker.event_id.as_uuid())
        .bind(&marker.event_type)
        .bind(marker.version)
        .bind(&marker.partition_id)
        .bind(marker.offset)
        .bind(marker.processed_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = marker_insert {
            // A concurrent delivery of the same event won the race for the
            // marker row; the whole apply is discarded, nothing partial.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("processed_events_pkey")
            {
                return Ok(false);
            }
            return Err(e.into());
        }

        sqlx::query(
            r#"
            INSERT INTO order_projections
                (order_id, customer_id, amount, currency, created_at, updated_at,
                 source_system, last_event_version, last_event_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (order_id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at,
                source_system = EXCLUDED.source_system,
                last_event_version = EXCLUDED.last_event_version,
                last_event_id = EXCLUDED.last_event_id
            "#,
        )
        .bind(&projection.order_id)
        .bind(&projection.customer_id)
        .bind(projection.amount)
        .bind(&projection.currency)
        .bind(projection.created_at)
        .bind(projection.updated_at)
        .bind(&projection.source_system)
        .bind(projection.last_event_version)
        .bind(projection.last_event_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn reset(&self) -> Result<()> {
        sqlx::query("TRUNCATE order_projections, processed_events")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
