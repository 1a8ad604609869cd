pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::OrderId;
pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryOrderTx};
pub use postgres::{PostgresOrderStore, PostgresOrderTx};
pub use record::{ItemId, LogId, OrderItemRecord, OrderRecord, StatusLogRecord};
pub use store::{ListQuery, OrderStore, OrderTx, Page, StatsQuery, StatsRecord};
