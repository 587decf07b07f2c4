use async_trait::async_trait;
use common::{ItemId, Money, OrderId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    InventoryItem, Order, OrderStatus, Result, StoreError,
    store::{InventoryStore, StockDecrement, StockLevel, validate_commit},
};

/// PostgreSQL-backed inventory store.
///
/// The `inventory` table's `available_quantity` column doubles as the
/// optimistic-concurrency guard: decrements are applied with
/// `UPDATE … WHERE available_quantity = expected`, so a row changed by
/// a concurrent commit makes the conditional write miss and the whole
/// transaction roll back.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_item(row: PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            id: ItemId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            unit: row.try_get("unit")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            available_quantity: quantity_from_db(row.try_get("available_quantity")?)?,
            active: row.try_get("active")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown order status {status_str}")))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            lines: serde_json::from_value(row.try_get("lines")?)?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            delivery_fee: Money::from_cents(row.try_get("delivery_fee_cents")?),
            grand_total: Money::from_cents(row.try_get("grand_total_cents")?),
            status,
            customer_ref: row.try_get("customer_ref")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Maps connection-level failures to `Unavailable` so callers can tell
/// a store outage apart from a data-level error.
fn map_db(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other),
    }
}

fn quantity_from_db(raw: i64) -> Result<u32> {
    u32::try_from(raw)
        .map_err(|_| StoreError::InvalidRecord(format!("negative stored quantity {raw}")))
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn get_item(&self, id: &ItemId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(
            "SELECT id, name, unit, price_cents, available_quantity, active \
             FROM inventory WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db)?;

        row.map(Self::row_to_item).transpose()
    }

    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<InventoryItem>>> {
        let id_strings: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = sqlx::query(
            "SELECT id, name, unit, price_cents, available_quantity, active \
             FROM inventory WHERE id = ANY($1)",
        )
        .bind(&id_strings)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db)?;

        let mut found = std::collections::HashMap::with_capacity(rows.len());
        for row in rows {
            let item = Self::row_to_item(row)?;
            found.insert(item.id.clone(), item);
        }

        Ok(ids.iter().map(|id| found.remove(id)).collect())
    }

    async fn upsert_item(&self, item: InventoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (id, name, unit, price_cents, available_quantity, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                unit = EXCLUDED.unit,
                price_cents = EXCLUDED.price_cents,
                available_quantity = EXCLUDED.available_quantity,
                active = EXCLUDED.active
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.name)
        .bind(&item.unit)
        .bind(item.price.cents())
        .bind(item.available_quantity as i64)
        .bind(item.active)
        .execute(&self.pool)
        .await
        .map_err(map_db)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, order, decrements), fields(order_id = %order.id, lines = decrements.len()))]
    async fn commit_order(
        &self,
        order: Order,
        decrements: Vec<StockDecrement>,
    ) -> Result<Vec<StockLevel>> {
        validate_commit(&order, &decrements)?;

        let mut tx = self.pool.begin().await.map_err(map_db)?;
        let mut levels = Vec::with_capacity(decrements.len());

        for decrement in &decrements {
            let new_quantity = decrement.resulting_quantity();

            let result = sqlx::query(
                "UPDATE inventory SET available_quantity = $1 \
                 WHERE id = $2 AND available_quantity = $3 AND active",
            )
            .bind(new_quantity as i64)
            .bind(decrement.item_id.as_str())
            .bind(decrement.expected_quantity as i64)
            .execute(&mut *tx)
            .await
            .map_err(map_db)?;

            if result.rows_affected() == 0 {
                // The precondition no longer holds; dropping the
                // transaction rolls back every prior decrement.
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT available_quantity FROM inventory WHERE id = $1")
                        .bind(decrement.item_id.as_str())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(map_db)?;

                return match actual {
                    Some(actual) => Err(StoreError::Conflict {
                        item_id: decrement.item_id.clone(),
                        expected: decrement.expected_quantity,
                        actual: quantity_from_db(actual)?,
                    }),
                    None => Err(StoreError::ItemNotFound(decrement.item_id.clone())),
                };
            }

            levels.push(StockLevel {
                item_id: decrement.item_id.clone(),
                available_quantity: new_quantity,
            });
        }

        let lines_json = serde_json::to_value(&order.lines)?;
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, lines, subtotal_cents, delivery_fee_cents, grand_total_cents,
                 status, customer_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(lines_json)
        .bind(order.subtotal.cents())
        .bind(order.delivery_fee.cents())
        .bind(order.grand_total.cents())
        .bind(order.status.as_str())
        .bind(&order.customer_ref)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db)?;

        tx.commit().await.map_err(map_db)?;

        tracing::debug!(order_id = %order.id, "order committed with stock decrements");
        Ok(levels)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, lines, subtotal_cents, delivery_fee_cents, grand_total_cents, \
                    status, customer_ref, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db)?;

        row.map(Self::row_to_order).transpose()
    }
}
