use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OrderId;

/// Unique identifier for an order line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an item ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ItemId> for Uuid {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// Unique identifier for a status log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl LogId {
    /// Creates a new random log ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a log ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LogId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<LogId> for Uuid {
    fn from(id: LogId) -> Self {
        id.0
    }
}

/// A row in the `orders` table.
///
/// The store deals in plain records; `order_number` and `status` are kept
/// as text here and parsed into their typed forms by the domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Unique identifier for this order.
    pub id: OrderId,

    /// Externally visible order number (e.g. "ES123456").
    pub order_number: String,

    /// Name of the customer who placed the order.
    pub customer_name: String,

    /// Contact email for the customer.
    pub customer_email: String,

    /// Optional contact phone number.
    pub customer_phone: Option<String>,

    /// Total charged for the order, exactly as supplied by the caller.
    pub total_amount: Decimal,

    /// Current lifecycle status (e.g. "CREATED", "SHIPPED").
    pub status: String,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A row in the `order_items` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: ItemId,
    pub order_id: OrderId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row in the `status_logs` table.
///
/// Log entries are append-only; they are removed only when the owning
/// order is deleted and its rows cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLogRecord {
    pub id: LogId,
    pub order_id: OrderId,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
