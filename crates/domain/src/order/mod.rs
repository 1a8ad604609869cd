//! Order aggregate and related types.

mod aggregate;
mod commands;
mod number;
mod reconcile;
mod service;
mod status;

pub use aggregate::{Order, OrderItem, StatusLog};
pub use commands::{ChangeStatus, CreateOrder, ItemChange, NewItem, UpdateOrder};
pub use number::{InvalidOrderNumber, OrderNumber};
pub use reconcile::{ItemDiff, ItemUpdate, reconcile};
pub use service::{OrderService, OrderStats};
pub use status::{OrderStatus, UnknownStatus};

use order_store::ItemId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is in a terminal status and cannot be edited.
    #[error("Order is finalized in {status} and can no longer be changed")]
    Finalized { status: OrderStatus },

    /// Requested transition is not in the allowed set.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// No free order number was found within the attempt budget.
    #[error("Could not find a free order number after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// The incoming item list would leave the order without items.
    #[error("An order must keep at least one item")]
    EmptyItems,

    /// An incoming item id does not belong to the order being updated.
    #[error("Item {item_id} does not belong to this order")]
    ForeignItem { item_id: ItemId },
}
