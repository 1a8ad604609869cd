use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ItemId, LogId, OrderId, OrderItemRecord, OrderRecord, Result, StatusLogRecord, StoreError,
    store::{ListQuery, OrderStore, OrderTx, Page, StatsQuery, StatsRecord},
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and returns a store backed by a
    /// fresh connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
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

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: row.try_get("order_number")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            id: ItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_log(row: PgRow) -> Result<StatusLogRecord> {
        Ok(StatusLogRecord {
            id: LogId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status: row.try_get("status")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Tx = PostgresOrderTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresOrderTx { tx })
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, customer_name, customer_email, customer_phone,
                   total_amount, status, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn fetch_items(&self, id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_name, quantity, unit_price, created_at, updated_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn fetch_items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItemRecord>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_name, quantity, unit_price, created_at, updated_at
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn fetch_logs(&self, id: OrderId) -> Result<Vec<StatusLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, message, created_at
            FROM status_logs
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_log).collect()
    }

    async fn fetch_logs_for_orders(&self, ids: &[OrderId]) -> Result<Vec<StatusLogRecord>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, message, created_at
            FROM status_logs
            WHERE order_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_log).collect()
    }

    async fn list_orders(&self, query: ListQuery) -> Result<Page<OrderRecord>> {
        let mut sql = String::from(
            "SELECT id, order_number, customer_name, customer_email, customer_phone, \
             total_amount, status, created_at, updated_at FROM orders",
        );
        let mut count_sql = String::from("SELECT COUNT(*) FROM orders");

        let pattern = query.search.as_ref().map(|term| format!("%{term}%"));
        if pattern.is_some() {
            let filter = " WHERE (order_number ILIKE $1 OR customer_email ILIKE $1)";
            sql.push_str(filter);
            count_sql.push_str(filter);
        }

        let (limit_param, offset_param) = if pattern.is_some() { (2, 3) } else { (1, 2) };
        sql.push_str(&format!(
            " ORDER BY created_at DESC, id ASC LIMIT ${limit_param} OFFSET ${offset_param}"
        ));

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut rows_query = sqlx::query(&sql);
        if let Some(ref pattern) = pattern {
            count_query = count_query.bind(pattern.clone());
            rows_query = rows_query.bind(pattern.clone());
        }

        let total: i64 = count_query.fetch_one(&self.pool).await?;
        let rows = rows_query
            .bind(i64::from(query.per_page))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let orders = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(orders, query.page, query.per_page, total as u64))
    }

    async fn stats(&self, query: StatsQuery) -> Result<StatsRecord> {
        let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let pending_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
                .bind(query.pending_status)
                .fetch_one(&self.pool)
                .await?;

        let revenue: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status = ANY($1)",
        )
        .bind(query.revenue_statuses)
        .fetch_one(&self.pool)
        .await?;

        let orders_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(query.day_start)
        .bind(query.day_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatsRecord {
            total_orders,
            pending_orders,
            revenue,
            orders_today,
        })
    }
}

/// An open transaction against a [`PostgresOrderStore`].
///
/// Wraps a sqlx transaction; dropping it without committing rolls back.
pub struct PostgresOrderTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTx for PostgresOrderTx {
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, customer_name, customer_email, customer_phone,
                                total_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.total_amount)
        .bind(&order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            // A unique violation on the order number is an expected
            // collision, not a database fault.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_number_key")
            {
                tracing::warn!(order_number = %order.order_number, "order number collision");
                return StoreError::DuplicateOrderNumber {
                    number: order.order_number.clone(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn insert_items(&mut self, items: &[OrderItemRecord]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_name, quantity, unit_price,
                                         created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, customer_name, customer_email, customer_phone,
                   total_amount, status, created_at, updated_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PostgresOrderStore::row_to_order).transpose()
    }

    async fn fetch_items(&mut self, id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_name, quantity, unit_price, created_at, updated_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(PostgresOrderStore::row_to_item).collect()
    }

    async fn fetch_logs(&mut self, id: OrderId) -> Result<Vec<StatusLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, status, message, created_at
            FROM status_logs
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(PostgresOrderStore::row_to_log).collect()
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET customer_name = $2, customer_email = $3, customer_phone = $4,
                total_amount = $5, status = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.total_amount)
        .bind(&order.status)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE order_items
            SET product_name = $2, quantity = $3, unit_price = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_items(&mut self, order_id: OrderId, item_ids: &[ItemId]) -> Result<()> {
        if item_ids.is_empty() {
            return Ok(());
        }

        let uuids: Vec<Uuid> = item_ids.iter().map(|id| id.as_uuid()).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND id = ANY($2)")
            .bind(order_id.as_uuid())
            .bind(uuids)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_log(&mut self, log: &StatusLogRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO status_logs (id, order_id, status, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.order_id.as_uuid())
        .bind(&log.status)
        .bind(&log.message)
        .bind(log.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
