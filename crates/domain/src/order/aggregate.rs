//! The order aggregate: header, line items, and status history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use common::OrderId;
use order_store::{ItemId, LogId, OrderItemRecord, OrderRecord, StatusLogRecord};

use crate::error::DomainError;

use super::{OrderNumber, OrderStatus};

/// A line item belonging to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// The quantity times the unit price. Derived on demand, never
    /// stored.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    pub(crate) fn from_record(record: OrderItemRecord) -> Self {
        Self {
            id: record.id,
            product_name: record.product_name,
            quantity: record.quantity,
            unit_price: record.unit_price,
        }
    }
}

/// One entry in an order's status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLog {
    pub id: LogId,
    pub status: OrderStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl StatusLog {
    fn from_record(record: StatusLogRecord) -> Result<Self, DomainError> {
        let status = parse_status(record.order_id, &record.status)?;
        Ok(Self {
            id: record.id,
            status,
            message: record.message,
            created_at: record.created_at,
        })
    }
}

/// A fully loaded order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// Customer-facing order number.
    pub order_number: OrderNumber,

    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,

    /// Total charged for the order. Stored as supplied at create or
    /// update time, not derived from the line items.
    pub total_amount: Decimal,

    /// Current lifecycle status.
    pub status: OrderStatus,

    pub items: Vec<OrderItem>,

    /// Audit trail entries, oldest first.
    pub status_logs: Vec<StatusLog>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Assembles an order from its stored rows.
    ///
    /// Fails with [`DomainError::CorruptRecord`] when a stored status or
    /// order number no longer parses.
    pub fn from_records(
        order: OrderRecord,
        items: Vec<OrderItemRecord>,
        logs: Vec<StatusLogRecord>,
    ) -> Result<Self, DomainError> {
        let status = parse_status(order.id, &order.status)?;
        let order_number =
            OrderNumber::parse(&order.order_number).map_err(|_| DomainError::CorruptRecord {
                order_id: order.id,
                field: "order_number",
                value: order.order_number.clone(),
            })?;
        let status_logs = logs
            .into_iter()
            .map(StatusLog::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: order.id,
            order_number,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            total_amount: order.total_amount,
            status,
            items: items.into_iter().map(OrderItem::from_record).collect(),
            status_logs,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    /// The statuses this order may transition into.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        self.status.allowed_transitions()
    }

    /// Returns true if the order is in a terminal status and can no
    /// longer be edited or transitioned.
    pub fn is_final(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Parses a status column value, mapping failures to `CorruptRecord`.
pub(crate) fn parse_status(order_id: OrderId, value: &str) -> Result<OrderStatus, DomainError> {
    value.parse().map_err(|_| DomainError::CorruptRecord {
        order_id,
        field: "status",
        value: value.to_string(),
    })
}
