//! Delivery slot repository.

use chrono::NaiveTime;
use sqlx::PgPool;
use tracing::instrument;

use carniceria_core::{DeliverySlot, DeliverySlotDraft, DeliverySlotId, weekday_from_iso};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct DeliverySlotRow {
    id: i32,
    weekday: i16,
    starts_at: NaiveTime,
    ends_at: NaiveTime,
    active: bool,
    max_orders: Option<i32>,
}

impl TryFrom<DeliverySlotRow> for DeliverySlot {
    type Error = RepositoryError;

    fn try_from(row: DeliverySlotRow) -> Result<Self, Self::Error> {
        let weekday = weekday_from_iso(row.weekday).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "delivery slot {}: weekday {} out of range",
                row.id, row.weekday
            ))
        })?;

        Ok(Self {
            id: DeliverySlotId::new(row.id),
            weekday,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            active: row.active,
            max_orders: row.max_orders.and_then(|n| u32::try_from(n).ok()),
        })
    }
}

/// Repository for delivery slot database operations.
pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All slots, by weekday then start time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DeliverySlot>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliverySlotRow>(
            r"
            SELECT id, weekday, starts_at, ends_at, active, max_orders
            FROM shop.delivery_slot
            ORDER BY weekday, starts_at, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Replace the whole weekly schedule.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// previous schedule is kept in that case.
    #[instrument(skip(self, drafts), fields(slots = drafts.len()))]
    pub async fn replace_all(
        &self,
        drafts: &[DeliverySlotDraft],
    ) -> Result<Vec<DeliverySlot>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shop.delivery_slot")
            .execute(&mut *tx)
            .await?;

        for draft in drafts {
            // number_from_monday is 1..=7 and always fits
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let weekday = draft.weekday.number_from_monday() as i16;
            let max_orders = draft
                .max_orders
                .map(i32::try_from)
                .transpose()
                .map_err(|e| RepositoryError::Conflict(format!("max orders: {e}")))?;

            sqlx::query(
                r"
                INSERT INTO shop.delivery_slot (weekday, starts_at, ends_at, active, max_orders)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(weekday)
            .bind(draft.starts_at)
            .bind(draft.ends_at)
            .bind(draft.active)
            .bind(max_orders)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.list().await
    }
}
