use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{ItemId, OrderId, OrderItemRecord, OrderRecord, Result, StatusLogRecord};

/// Paging and filtering for order listings.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,

    /// Number of orders per page.
    pub per_page: u32,

    /// Case-insensitive substring match against order number and
    /// customer email.
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            search: None,
        }
    }
}

impl ListQuery {
    /// Creates a query for the first page with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number (1-based).
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Filters by a search term.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Number of rows to skip for the requested page.
    ///
    /// Page numbers below 1 are treated as page 1.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page)
    }
}

/// One page of results together with pagination totals.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Builds a page, deriving `total_pages` from the total row count.
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total_items: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(per_page)) as u32
        };
        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}

/// Parameters for the dashboard aggregation.
///
/// Which statuses count as pending or as revenue is business policy, so
/// the caller supplies them; the store only executes the aggregation.
#[derive(Debug, Clone)]
pub struct StatsQuery {
    /// Status counted as "pending".
    pub pending_status: String,

    /// Statuses whose totals count toward revenue.
    pub revenue_statuses: Vec<String>,

    /// Start of the current day (inclusive).
    pub day_start: DateTime<Utc>,

    /// End of the current day (exclusive).
    pub day_end: DateTime<Utc>,
}

/// Raw aggregation results for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub revenue: Decimal,
    pub orders_today: i64,
}

/// Core trait for order store implementations.
///
/// A store persists orders, their line items, and the status audit trail.
/// Reads on this trait run outside any transaction at default read
/// consistency; all writes go through an [`OrderTx`] obtained from
/// [`OrderStore::begin`]. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Transaction handle type for this store.
    type Tx: OrderTx;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Fetches a single order row, or None if it does not exist.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Fetches the line items of an order, oldest first.
    async fn fetch_items(&self, id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Fetches the line items of several orders in one round trip.
    async fn fetch_items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItemRecord>>;

    /// Fetches the status log of an order in chronological order.
    async fn fetch_logs(&self, id: OrderId) -> Result<Vec<StatusLogRecord>>;

    /// Fetches the status logs of several orders in one round trip.
    async fn fetch_logs_for_orders(&self, ids: &[OrderId]) -> Result<Vec<StatusLogRecord>>;

    /// Lists orders newest first, with optional search and pagination.
    async fn list_orders(&self, query: ListQuery) -> Result<Page<OrderRecord>>;

    /// Runs the dashboard aggregation.
    async fn stats(&self, query: StatsQuery) -> Result<StatsRecord>;
}

/// A transaction against the order store.
///
/// All writes within one transaction commit atomically via
/// [`OrderTx::commit`]; dropping the transaction without committing
/// rolls every write back.
#[async_trait]
pub trait OrderTx: Send {
    /// Inserts a new order row.
    ///
    /// Fails with [`StoreError::DuplicateOrderNumber`] when the order
    /// number is already taken, leaving the transaction unusable; the
    /// caller is expected to drop it and retry with a fresh number.
    ///
    /// [`StoreError::DuplicateOrderNumber`]: crate::StoreError::DuplicateOrderNumber
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Inserts line items for an order.
    async fn insert_items(&mut self, items: &[OrderItemRecord]) -> Result<()>;

    /// Fetches an order row and locks it for the remainder of the
    /// transaction, serializing concurrent writers of the same order.
    ///
    /// Returns None if the order does not exist.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Fetches the line items of an order, oldest first.
    async fn fetch_items(&mut self, id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Fetches the status log of an order in chronological order.
    async fn fetch_logs(&mut self, id: OrderId) -> Result<Vec<StatusLogRecord>>;

    /// Writes the mutable columns of an order row (customer fields,
    /// total, status, updated_at).
    async fn update_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Writes the mutable columns of a line item row.
    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()>;

    /// Deletes the given line items of an order.
    async fn delete_items(&mut self, order_id: OrderId, item_ids: &[ItemId]) -> Result<()>;

    /// Appends a status log entry.
    async fn insert_log(&mut self, log: &StatusLogRecord) -> Result<()>;

    /// Commits the transaction.
    async fn commit(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults() {
        let query = ListQuery::new();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
        assert!(query.search.is_none());
    }

    #[test]
    fn list_query_builder_chain() {
        let query = ListQuery::new().page(3).per_page(25).search("ES1");
        assert_eq!(query.page, 3);
        assert_eq!(query.per_page, 25);
        assert_eq!(query.search.as_deref(), Some("ES1"));
    }

    #[test]
    fn list_query_offset() {
        assert_eq!(ListQuery::new().offset(), 0);
        assert_eq!(ListQuery::new().page(3).per_page(10).offset(), 20);
        // Page 0 is treated as page 1.
        assert_eq!(ListQuery::new().page(0).offset(), 0);
    }

    #[test]
    fn page_derives_total_pages() {
        let page: Page<u32> = Page::new(vec![], 1, 10, 0);
        assert_eq!(page.total_pages, 0);

        let page: Page<u32> = Page::new(vec![], 1, 10, 25);
        assert_eq!(page.total_pages, 3);

        let page: Page<u32> = Page::new(vec![], 1, 10, 30);
        assert_eq!(page.total_pages, 3);
    }
}
