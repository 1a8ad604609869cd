use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    ItemId, OrderId, OrderItemRecord, OrderRecord, Result, StatusLogRecord, StoreError,
    store::{ListQuery, OrderStore, OrderTx, Page, StatsQuery, StatsRecord},
};

/// All rows held by the in-memory store.
#[derive(Debug, Clone, Default)]
struct Dataset {
    orders: Vec<OrderRecord>,
    items: Vec<OrderItemRecord>,
    logs: Vec<StatusLogRecord>,
}

impl Dataset {
    fn items_of(&self, id: OrderId) -> Vec<OrderItemRecord> {
        let mut items: Vec<_> = self
            .items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        items
    }

    fn logs_of(&self, id: OrderId) -> Vec<StatusLogRecord> {
        let mut logs: Vec<_> = self
            .logs
            .iter()
            .filter(|l| l.order_id == id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        logs
    }
}

/// In-memory order store implementation for testing.
///
/// Stores all rows in memory and provides the same interface and the same
/// observable transaction semantics as the PostgreSQL implementation:
/// writers are serialized, duplicate order numbers are rejected, and a
/// transaction dropped without commit leaves the store untouched.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    data: Arc<RwLock<Dataset>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.data.read().await.orders.len()
    }

    /// Clears all orders, items, and logs.
    pub async fn clear(&self) {
        let mut data = self.data.write().await;
        *data = Dataset::default();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Tx = InMemoryOrderTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.data.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(InMemoryOrderTx { guard, working })
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let data = self.data.read().await;
        Ok(data.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn fetch_items(&self, id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let data = self.data.read().await;
        Ok(data.items_of(id))
    }

    async fn fetch_items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItemRecord>> {
        let data = self.data.read().await;
        let mut items: Vec<_> = data
            .items
            .iter()
            .filter(|i| ids.contains(&i.order_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(items)
    }

    async fn fetch_logs(&self, id: OrderId) -> Result<Vec<StatusLogRecord>> {
        let data = self.data.read().await;
        Ok(data.logs_of(id))
    }

    async fn fetch_logs_for_orders(&self, ids: &[OrderId]) -> Result<Vec<StatusLogRecord>> {
        let data = self.data.read().await;
        let mut logs: Vec<_> = data
            .logs
            .iter()
            .filter(|l| ids.contains(&l.order_id))
            .cloned()
            .collect();
        logs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        Ok(logs)
    }

    async fn list_orders(&self, query: ListQuery) -> Result<Page<OrderRecord>> {
        let data = self.data.read().await;
        let term = query.search.as_ref().map(|t| t.to_lowercase());

        let mut matches: Vec<_> = data
            .orders
            .iter()
            .filter(|o| match &term {
                Some(t) => {
                    o.order_number.to_lowercase().contains(t)
                        || o.customer_email.to_lowercase().contains(t)
                }
                None => true,
            })
            .cloned()
            .collect();

        // Newest first, with a stable tie-break.
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.as_uuid().cmp(&b.id.as_uuid()))
        });

        let total = matches.len() as u64;
        let items: Vec<_> = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();

        Ok(Page::new(items, query.page, query.per_page, total))
    }

    async fn stats(&self, query: StatsQuery) -> Result<StatsRecord> {
        let data = self.data.read().await;

        let total_orders = data.orders.len() as i64;
        let pending_orders = data
            .orders
            .iter()
            .filter(|o| o.status == query.pending_status)
            .count() as i64;
        let revenue: Decimal = data
            .orders
            .iter()
            .filter(|o| query.revenue_statuses.contains(&o.status))
            .map(|o| o.total_amount)
            .sum();
        let orders_today = data
            .orders
            .iter()
            .filter(|o| o.created_at >= query.day_start && o.created_at < query.day_end)
            .count() as i64;

        Ok(StatsRecord {
            total_orders,
            pending_orders,
            revenue,
            orders_today,
        })
    }
}

/// An open transaction against an [`InMemoryOrderStore`].
///
/// Holds the store's write lock for its whole lifetime, which serializes
/// concurrent transactions the way row locks do on PostgreSQL. Writes go
/// to a working copy that replaces the shared data only on commit.
pub struct InMemoryOrderTx {
    guard: OwnedRwLockWriteGuard<Dataset>,
    working: Dataset,
}

#[async_trait]
impl OrderTx for InMemoryOrderTx {
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        if self
            .working
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber {
                number: order.order_number.clone(),
            });
        }

        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn insert_items(&mut self, items: &[OrderItemRecord]) -> Result<()> {
        self.working.items.extend_from_slice(items);
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn fetch_items(&mut self, id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self.working.items_of(id))
    }

    async fn fetch_logs(&mut self, id: OrderId) -> Result<Vec<StatusLogRecord>> {
        Ok(self.working.logs_of(id))
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        // Only the mutable columns, matching the SQL UPDATE.
        if let Some(existing) = self.working.orders.iter_mut().find(|o| o.id == order.id) {
            existing.customer_name = order.customer_name.clone();
            existing.customer_email = order.customer_email.clone();
            existing.customer_phone = order.customer_phone.clone();
            existing.total_amount = order.total_amount;
            existing.status = order.status.clone();
            existing.updated_at = order.updated_at;
        }
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        if let Some(existing) = self.working.items.iter_mut().find(|i| i.id == item.id) {
            existing.product_name = item.product_name.clone();
            existing.quantity = item.quantity;
            existing.unit_price = item.unit_price;
            existing.updated_at = item.updated_at;
        }
        Ok(())
    }

    async fn delete_items(&mut self, order_id: OrderId, item_ids: &[ItemId]) -> Result<()> {
        self.working
            .items
            .retain(|i| !(i.order_id == order_id && item_ids.contains(&i.id)));
        Ok(())
    }

    async fn insert_log(&mut self, log: &StatusLogRecord) -> Result<()> {
        self.working.logs.push(log.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let InMemoryOrderTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::LogId;

    fn sample_order(number: &str) -> OrderRecord {
        OrderRecord {
            id: OrderId::new(),
            order_number: number.to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: None,
            total_amount: Decimal::new(1000, 2),
            status: "CREATED".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_item(order_id: OrderId, product: &str) -> OrderItemRecord {
        OrderItemRecord {
            id: ItemId::new(),
            order_id,
            product_name: product.to_string(),
            quantity: 1,
            unit_price: Decimal::new(500, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_order() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES100001");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = store.fetch_order(order.id).await.unwrap();
        assert_eq!(fetched, Some(order));
    }

    #[tokio::test]
    async fn duplicate_order_number_rejected() {
        let store = InMemoryOrderStore::new();
        let first = sample_order("ES100002");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&first).await.unwrap();
        tx.commit().await.unwrap();

        let second = sample_order("ES100002");
        let mut tx = store.begin().await.unwrap();
        let result = tx.insert_order(&second).await;

        assert!(matches!(
            result,
            Err(StoreError::DuplicateOrderNumber { .. })
        ));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES100003");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        drop(tx);

        assert_eq!(store.fetch_order(order.id).await.unwrap(), None);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn update_order_preserves_immutable_columns() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES100004");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let mut changed = order.clone();
        changed.order_number = "ES999999".to_string();
        changed.customer_name = "John Smith".to_string();

        let mut tx = store.begin().await.unwrap();
        tx.update_order(&changed).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = store.fetch_order(order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order_number, "ES100004");
        assert_eq!(fetched.customer_name, "John Smith");
    }

    #[tokio::test]
    async fn delete_items_removes_only_given_ids() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES100005");
        let keep = sample_item(order.id, "Widget");
        let remove = sample_item(order.id, "Gadget");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.insert_items(&[keep.clone(), remove.clone()]).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_items(order.id, &[remove.id]).await.unwrap();
        tx.commit().await.unwrap();

        let items = store.fetch_items(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, keep.id);
    }

    #[tokio::test]
    async fn logs_fetched_in_chronological_order() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES100006");
        let now = Utc::now();

        let older = StatusLogRecord {
            id: LogId::new(),
            order_id: order.id,
            status: "CANCELLED".to_string(),
            message: "first".to_string(),
            created_at: now - Duration::seconds(10),
        };
        let newer = StatusLogRecord {
            id: LogId::new(),
            order_id: order.id,
            status: "CANCELLED".to_string(),
            message: "second".to_string(),
            created_at: now,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.insert_log(&newer).await.unwrap();
        tx.insert_log(&older).await.unwrap();
        tx.commit().await.unwrap();

        let logs = store.fetch_logs(order.id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "first");
        assert_eq!(logs[1].message, "second");
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_pagination() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        for i in 0..5 {
            let mut order = sample_order(&format!("ES10001{i}"));
            order.created_at = now - Duration::minutes(i);
            tx.insert_order(&order).await.unwrap();
        }
        tx.commit().await.unwrap();

        let page = store
            .list_orders(ListQuery::new().page(1).per_page(2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        // i = 0 is the most recent.
        assert_eq!(page.items[0].order_number, "ES100010");
        assert_eq!(page.items[1].order_number, "ES100011");

        let last = store
            .list_orders(ListQuery::new().page(3).per_page(2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].order_number, "ES100014");
    }

    #[tokio::test]
    async fn list_orders_breaks_created_at_ties_by_id() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        for i in 0..3 {
            let mut order = sample_order(&format!("ES70000{i}"));
            order.created_at = now;
            order.updated_at = now;
            tx.insert_order(&order).await.unwrap();
        }
        tx.commit().await.unwrap();

        let page = store.list_orders(ListQuery::new()).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|o| o.id.as_uuid()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn list_orders_searches_number_and_email() {
        let store = InMemoryOrderStore::new();

        let by_number = sample_order("ES200001");
        let mut by_email = sample_order("ES300001");
        by_email.customer_email = "carlos@ejemplo.com".to_string();
        let unrelated = sample_order("ES400001");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&by_number).await.unwrap();
        tx.insert_order(&by_email).await.unwrap();
        tx.insert_order(&unrelated).await.unwrap();
        tx.commit().await.unwrap();

        let page = store
            .list_orders(ListQuery::new().search("es2000"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, by_number.id);

        let page = store
            .list_orders(ListQuery::new().search("CARLOS"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, by_email.id);
    }

    #[tokio::test]
    async fn stats_aggregates_by_status_and_day() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();

        let mut created = sample_order("ES500001");
        created.total_amount = Decimal::new(1000, 2);

        let mut confirmed = sample_order("ES500002");
        confirmed.status = "CONFIRMED".to_string();
        confirmed.total_amount = Decimal::new(2000, 2);

        let mut delivered = sample_order("ES500003");
        delivered.status = "DELIVERED".to_string();
        delivered.total_amount = Decimal::new(3000, 2);
        delivered.created_at = now - Duration::days(2);

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&created).await.unwrap();
        tx.insert_order(&confirmed).await.unwrap();
        tx.insert_order(&delivered).await.unwrap();
        tx.commit().await.unwrap();

        let stats = store
            .stats(StatsQuery {
                pending_status: "CREATED".to_string(),
                revenue_statuses: vec![
                    "CONFIRMED".to_string(),
                    "SHIPPED".to_string(),
                    "DELIVERED".to_string(),
                ],
                day_start: now - Duration::hours(1),
                day_end: now + Duration::hours(1),
            })
            .await
            .unwrap();

        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.revenue, Decimal::new(5000, 2));
        // The delivered order is two days old.
        assert_eq!(stats.orders_today, 2);
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = InMemoryOrderStore::new();
        let order = sample_order("ES600001");

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.insert_items(&[sample_item(order.id, "Widget")]).await.unwrap();
        tx.commit().await.unwrap();

        store.clear().await;

        assert_eq!(store.order_count().await, 0);
        assert!(store.fetch_items(order.id).await.unwrap().is_empty());
    }
}
