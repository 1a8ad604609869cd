//! Order service providing atomic operations over an order store.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use common::OrderId;
use order_store::{
    ItemId, ListQuery, LogId, OrderItemRecord, OrderRecord, OrderStore, OrderTx, Page, StatsQuery,
    StatusLogRecord, StoreError,
};

use crate::error::DomainError;

use super::{
    ChangeStatus, CreateOrder, Order, OrderError, OrderItem, OrderNumber, OrderStatus, UpdateOrder,
    aggregate::parse_status, reconcile,
};

impl From<super::OrderError> for DomainError {
    fn from(e: super::OrderError) -> Self {
        DomainError::Order(e)
    }
}

/// Maximum attempts to find a free order number before giving up.
const MAX_NUMBER_ATTEMPTS: u32 = 10;

/// Statuses whose totals count toward revenue.
const REVENUE_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Aggregate statistics over all orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
    /// Orders in any status.
    pub total_orders: i64,

    /// Orders still in CREATED.
    pub pending_orders: i64,

    /// Sum of `total_amount` over CONFIRMED, SHIPPED, and DELIVERED
    /// orders.
    pub revenue: Decimal,

    /// Orders created during the current local calendar day.
    pub orders_today: i64,
}

/// Service for managing orders.
///
/// Wraps an [`OrderStore`] and runs every mutating operation inside a
/// single transaction, so an order and its items never change
/// independently.
pub struct OrderService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new order with its initial items.
    ///
    /// Order numbers are drawn at random and inserted speculatively; a
    /// duplicate rolls the transaction back and retries with a fresh
    /// number, up to a fixed number of attempts.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        if cmd.items.is_empty() {
            return Err(OrderError::EmptyItems.into());
        }

        let create_start = std::time::Instant::now();
        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let number = OrderNumber::random();
            match self.try_create(&cmd, &number).await {
                Ok(order) => {
                    metrics::counter!("orders_created_total").increment(1);
                    metrics::histogram!("order_create_duration_seconds")
                        .record(create_start.elapsed().as_secs_f64());
                    return Ok(order);
                }
                Err(DomainError::Store(StoreError::DuplicateOrderNumber { .. })) => {
                    metrics::counter!("order_number_retries_total").increment(1);
                    tracing::debug!(attempt, number = %number, "order number taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(OrderError::GenerationExhausted {
            attempts: MAX_NUMBER_ATTEMPTS,
        }
        .into())
    }

    /// One creation attempt under a specific order number.
    async fn try_create(
        &self,
        cmd: &CreateOrder,
        number: &OrderNumber,
    ) -> Result<Order, DomainError> {
        let now = Utc::now();
        let order_id = OrderId::new();

        let record = OrderRecord {
            id: order_id,
            order_number: number.as_str().to_string(),
            customer_name: cmd.customer_name.clone(),
            customer_email: cmd.customer_email.clone(),
            customer_phone: cmd.customer_phone.clone(),
            total_amount: cmd.total_amount,
            status: OrderStatus::Created.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItemRecord> = cmd
            .items
            .iter()
            .map(|item| OrderItemRecord {
                id: ItemId::new(),
                order_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let mut tx = self.store.begin().await?;
        tx.insert_order(&record).await?;
        tx.insert_items(&items).await?;
        tx.commit().await?;

        Order::from_records(record, items, vec![])
    }

    /// Applies scalar changes and/or a full item replacement to a
    /// non-terminal order.
    ///
    /// The order row is locked for the duration, so concurrent updates
    /// serialize rather than interleave. On any failure nothing is
    /// applied.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, order_id: OrderId, cmd: UpdateOrder) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let mut record = tx
            .lock_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id })?;

        let status = parse_status(record.id, &record.status)?;
        if status.is_terminal() {
            return Err(OrderError::Finalized { status }.into());
        }

        let now = Utc::now();
        if let Some(name) = cmd.customer_name {
            record.customer_name = name;
        }
        if let Some(email) = cmd.customer_email {
            record.customer_email = email;
        }
        if let Some(phone) = cmd.customer_phone {
            record.customer_phone = phone;
        }
        if let Some(total) = cmd.total_amount {
            record.total_amount = total;
        }
        record.updated_at = now;

        if let Some(changes) = cmd.items {
            let current = tx.fetch_items(order_id).await?;
            let existing: Vec<OrderItem> = current
                .iter()
                .cloned()
                .map(OrderItem::from_record)
                .collect();
            let diff = reconcile(&existing, &changes)?;

            tx.delete_items(order_id, &diff.delete).await?;

            for update in &diff.update {
                if let Some(base) = current.iter().find(|item| item.id == update.id) {
                    tx.update_item(&OrderItemRecord {
                        id: update.id,
                        order_id,
                        product_name: update.product_name.clone(),
                        quantity: update.quantity,
                        unit_price: update.unit_price,
                        created_at: base.created_at,
                        updated_at: now,
                    })
                    .await?;
                }
            }

            let inserts: Vec<OrderItemRecord> = diff
                .insert
                .iter()
                .map(|item| OrderItemRecord {
                    id: ItemId::new(),
                    order_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    created_at: now,
                    updated_at: now,
                })
                .collect();
            tx.insert_items(&inserts).await?;
        }

        tx.update_order(&record).await?;

        let items = tx.fetch_items(order_id).await?;
        let logs = tx.fetch_logs(order_id).await?;
        tx.commit().await?;

        Order::from_records(record, items, logs)
    }

    /// Transitions an order to a new status.
    ///
    /// Resubmitting the current status succeeds without changing
    /// anything. Transitions into CANCELLED or RETURNED append one
    /// audit log entry, substituting a per-status default message when
    /// the caller supplies none.
    #[tracing::instrument(skip(self), fields(status = %cmd.status))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        cmd: ChangeStatus,
    ) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let mut record = tx
            .lock_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id })?;

        let current = parse_status(record.id, &record.status)?;

        if cmd.status == current {
            let items = tx.fetch_items(order_id).await?;
            let logs = tx.fetch_logs(order_id).await?;
            tx.commit().await?;
            return Order::from_records(record, items, logs);
        }

        if !current.can_transition(cmd.status) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: cmd.status,
            }
            .into());
        }

        let now = Utc::now();
        record.status = cmd.status.as_str().to_string();
        record.updated_at = now;
        tx.update_order(&record).await?;

        if let Some(default) = cmd.status.default_audit_message() {
            let message = match cmd.message {
                Some(m) if !m.trim().is_empty() => m,
                _ => default.to_string(),
            };
            tx.insert_log(&StatusLogRecord {
                id: LogId::new(),
                order_id,
                status: cmd.status.as_str().to_string(),
                message,
                created_at: now,
            })
            .await?;
        }

        let items = tx.fetch_items(order_id).await?;
        let logs = tx.fetch_logs(order_id).await?;
        tx.commit().await?;

        metrics::counter!("status_transitions_total").increment(1);

        Order::from_records(record, items, logs)
    }

    /// Loads an order with its items and status history.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let record = self
            .store
            .fetch_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id })?;
        let items = self.store.fetch_items(order_id).await?;
        let logs = self.store.fetch_logs(order_id).await?;
        Order::from_records(record, items, logs)
    }

    /// The transitions currently allowed for an order.
    #[tracing::instrument(skip(self))]
    pub async fn allowed_transitions(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderStatus>, DomainError> {
        let record = self
            .store
            .fetch_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id })?;
        let status = parse_status(record.id, &record.status)?;
        Ok(status.allowed_transitions().to_vec())
    }

    /// Lists orders newest first, with optional search over the order
    /// number and customer email.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: ListQuery) -> Result<Page<Order>, DomainError> {
        let page = self.store.list_orders(query).await?;

        let ids: Vec<OrderId> = page.items.iter().map(|record| record.id).collect();
        let mut items_by_order: HashMap<OrderId, Vec<OrderItemRecord>> = HashMap::new();
        for item in self.store.fetch_items_for_orders(&ids).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
        let mut logs_by_order: HashMap<OrderId, Vec<StatusLogRecord>> = HashMap::new();
        for log in self.store.fetch_logs_for_orders(&ids).await? {
            logs_by_order.entry(log.order_id).or_default().push(log);
        }

        let mut orders = Vec::with_capacity(page.items.len());
        for record in page.items {
            let items = items_by_order.remove(&record.id).unwrap_or_default();
            let logs = logs_by_order.remove(&record.id).unwrap_or_default();
            orders.push(Order::from_records(record, items, logs)?);
        }

        Ok(Page {
            items: orders,
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        })
    }

    /// Computes the dashboard statistics.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<OrderStats, DomainError> {
        let (day_start, day_end) = local_day_bounds(Local::now());
        let record = self
            .store
            .stats(StatsQuery {
                pending_status: OrderStatus::Created.as_str().to_string(),
                revenue_statuses: REVENUE_STATUSES
                    .iter()
                    .map(|status| status.as_str().to_string())
                    .collect(),
                day_start,
                day_end,
            })
            .await?;

        Ok(OrderStats {
            total_orders: record.total_orders,
            pending_orders: record.pending_orders,
            revenue: record.revenue,
            orders_today: record.orders_today,
        })
    }
}

/// `[start, end)` of the local calendar day containing `now`, as UTC
/// instants.
fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    (
        local_day_start(today),
        local_day_start(today + Duration::days(1)),
    )
}

/// First instant of `day` in local time, converted to UTC.
///
/// When a DST gap swallows local midnight, the first valid time after
/// the gap is used instead.
fn local_day_start(day: NaiveDate) -> DateTime<Utc> {
    let mut candidate = day.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        if let Some(start) = candidate.and_local_timezone(Local).earliest() {
            return start.with_timezone(&Utc);
        }
        candidate += Duration::hours(1);
    }
    candidate.and_utc()
}
