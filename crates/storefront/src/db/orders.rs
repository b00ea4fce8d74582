//! Order repository.
//!
//! Orders are written once, header and lines in a single transaction, and
//! afterwards only their status changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use carniceria_core::{
    BoneOption, CustomerSnapshot, CutFormat, Kilograms, Money, NewOrder, Order, OrderId,
    OrderLine, OrderStatus, ProductId, ProfileId,
};

use super::RepositoryError;

const ORDER_COLUMNS: &str = r"
    id, profile_id, customer_name, customer_phone, customer_address, delivery_address,
    delivery_phone, notes, subtotal, delivery_fee, total, status, submission_key,
    created_at, updated_at
";

/// Outcome of writing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new order was stored.
    Created(OrderId),
    /// An order with the same submission key already existed.
    Duplicate(OrderId),
}

impl Submission {
    #[must_use]
    pub const fn order_id(self) -> OrderId {
        match self {
            Self::Created(id) | Self::Duplicate(id) => id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    profile_id: Option<i32>,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    delivery_address: String,
    delivery_phone: String,
    notes: Option<String>,
    subtotal: i64,
    delivery_fee: i64,
    total: i64,
    status: OrderStatus,
    submission_key: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId::new(self.id),
            profile_id: self.profile_id.map(ProfileId::new),
            customer: CustomerSnapshot {
                name: self.customer_name,
                phone: self.customer_phone,
                address: self.customer_address,
            },
            delivery_address: self.delivery_address,
            delivery_phone: self.delivery_phone,
            notes: self.notes,
            subtotal: Money::new(self.subtotal),
            delivery_fee: Money::new(self.delivery_fee),
            total: Money::new(self.total),
            status: self.status,
            submission_key: self.submission_key,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    quantity: i32,
    weight_kg: Option<Decimal>,
    unit_price: i64,
    line_total: i64,
    format: Option<String>,
    bone: Option<String>,
    vacuum_packed: bool,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("order {} line: {e}", row.order_id))
        };

        Ok(Self {
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            quantity: u32::try_from(row.quantity).map_err(|e| corrupt(&e))?,
            weight_kg: row
                .weight_kg
                .map(Kilograms::new)
                .transpose()
                .map_err(|e| corrupt(&e))?,
            unit_price: Money::new(row.unit_price),
            line_total: Money::new(row.line_total),
            format: row
                .format
                .as_deref()
                .map(str::parse::<CutFormat>)
                .transpose()
                .map_err(|e| corrupt(&e))?,
            bone: row
                .bone
                .as_deref()
                .map(str::parse::<BoneOption>)
                .transpose()
                .map_err(|e| corrupt(&e))?,
            vacuum_packed: row.vacuum_packed,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store an order and its lines atomically.
    ///
    /// If an order with the same submission key exists, nothing is written
    /// and its ID is returned as [`Submission::Duplicate`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back and no partial order remains.
    #[instrument(
        skip(self, order),
        fields(submission_key = %order.submission_key, lines = order.lines.len())
    )]
    pub async fn create(&self, order: &NewOrder) -> Result<Submission, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.orders
                (profile_id, customer_name, customer_phone, customer_address, delivery_address,
                 delivery_phone, notes, subtotal, delivery_fee, total, submission_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (submission_key) DO NOTHING
            RETURNING id
            ",
        )
        .bind(order.profile_id)
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(&order.delivery_address)
        .bind(&order.delivery_phone)
        .bind(&order.notes)
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.total)
        .bind(order.submission_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = inserted else {
            tx.rollback().await?;
            let existing = sqlx::query_scalar::<_, i32>(
                "SELECT id FROM shop.orders WHERE submission_key = $1",
            )
            .bind(order.submission_key)
            .fetch_one(self.pool)
            .await?;
            tracing::info!(order_id = existing, "Duplicate order submission");
            return Ok(Submission::Duplicate(OrderId::new(existing)));
        };

        for (position, line) in (0_i32..).zip(&order.lines) {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::Conflict(format!("quantity {} is too large", line.quantity))
            })?;
            sqlx::query(
                r"
                INSERT INTO shop.order_line
                    (order_id, position, product_id, product_name, quantity, weight_kg,
                     unit_price, line_total, format, bone, vacuum_packed)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(order_id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(quantity)
            .bind(line.weight_kg.map(Kilograms::value))
            .bind(line.unit_price)
            .bind(line.line_total)
            .bind(line.format.map(|f| f.to_string()))
            .bind(line.bone.map(BoneOption::as_str))
            .bind(line.vacuum_packed)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Submission::Created(OrderId::new(order_id)))
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut lines = self.lines_for(&[row.id]).await?;
        let items = lines.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_order(items)))
    }

    /// List orders, newest first, optionally only those in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE $1::shop.order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        self.with_lines(rows).await
    }

    /// A shopper's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE profile_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(profile_id)
        .fetch_all(self.pool)
        .await?;

        self.with_lines(rows).await
    }

    /// Move an order to a new status, enforcing the order lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::Conflict` if the lifecycle forbids the move.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<OrderStatus, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let next = current
            .transition(to)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        sqlx::query("UPDATE shop.orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
        Ok(next)
    }

    /// Number of orders in each status. Statuses with no orders are zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM shop.orders GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let counts: HashMap<OrderStatus, i64> = rows.into_iter().collect();
        Ok(OrderStatus::ALL
            .into_iter()
            .map(|status| (status, counts.get(&status).copied().unwrap_or(0)))
            .collect())
    }

    async fn with_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let items = lines.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    async fn lines_for(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderLine>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT order_id, product_id, product_name, quantity, weight_kg, unit_price,
                   line_total, format, bone, vacuum_packed
            FROM shop.order_line
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_row_conversion() {
        let row = OrderLineRow {
            order_id: 1,
            product_id: None,
            product_name: "Bondiola".into(),
            quantity: 2,
            weight_kg: Some(Decimal::new(5, 1)),
            unit_price: 3500,
            line_total: 8000,
            format: Some("sliced-3".into()),
            bone: Some("boneless".into()),
            vacuum_packed: true,
        };
        let line = OrderLine::try_from(row).expect("valid line");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.format, Some(CutFormat::Sliced(3)));
        assert_eq!(line.bone, Some(BoneOption::Boneless));
        assert_eq!(line.product_id, None);
    }

    #[test]
    fn test_negative_quantity_is_corruption() {
        let row = OrderLineRow {
            order_id: 1,
            product_id: Some(3),
            product_name: "Chorizo".into(),
            quantity: -1,
            weight_kg: None,
            unit_price: 1200,
            line_total: 1200,
            format: None,
            bone: None,
            vacuum_packed: false,
        };
        assert!(matches!(
            OrderLine::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_submission_order_id() {
        let id = OrderId::new(9);
        assert_eq!(Submission::Created(id).order_id(), id);
        assert_eq!(Submission::Duplicate(id).order_id(), id);
    }
}
