//! Domain layer for the order management system.
//!
//! This crate provides the core order model and its operations:
//! - Order aggregate assembled from stored rows
//! - Status state machine with an explicit transition table
//! - Collision-tolerant order number generation
//! - Diff-based item reconciliation for updates
//! - OrderService running each operation in one transaction

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    ChangeStatus, CreateOrder, ItemChange, ItemDiff, NewItem, Order, OrderError, OrderItem,
    OrderNumber, OrderService, OrderStats, OrderStatus, StatusLog, UpdateOrder,
};
