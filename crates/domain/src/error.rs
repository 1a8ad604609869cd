//! Domain error types.

use common::OrderId;
use order_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A business rule rejected the operation.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// Order not found.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// A stored row no longer parses into domain types.
    #[error("Corrupt stored order {order_id}: bad {field} value {value:?}")]
    CorruptRecord {
        order_id: OrderId,
        field: &'static str,
        value: String,
    },
}
