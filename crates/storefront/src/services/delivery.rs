//! Delivery schedule lookups in the shop's local time.

use chrono::{FixedOffset, NaiveDateTime, Utc};
use sqlx::PgPool;
use tracing::error;

use carniceria_core::{DeliverySlot, NextDelivery, next_delivery};

use crate::db::DeliveryRepository;

/// The current wall-clock time at the shop.
#[must_use]
pub fn shop_now(offset: FixedOffset) -> NaiveDateTime {
    Utc::now().with_timezone(&offset).naive_local()
}

/// Every delivery slot. A database failure degrades to an empty schedule.
pub async fn schedule(pool: &PgPool) -> Vec<DeliverySlot> {
    DeliveryRepository::new(pool)
        .list()
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to load delivery slots");
            Vec::new()
        })
}

/// The next delivery window from now, if any slot is active.
pub async fn upcoming(pool: &PgPool, offset: FixedOffset) -> Option<NextDelivery> {
    next_delivery(&schedule(pool).await, shop_now(offset))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_now_applies_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let local = shop_now(offset);
        let utc = Utc::now().naive_utc();
        let diff = (utc - local).num_minutes();
        assert!((179..=181).contains(&diff), "diff was {diff}");
    }
}
