//! Order commands.

use rust_decimal::Decimal;

use order_store::ItemId;

use super::OrderStatus;

/// A line item in a create payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl NewItem {
    /// Creates a new line item payload.
    pub fn new(product_name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

/// Command to create a new order.
///
/// The order number and all row identifiers are assigned by the
/// service, never by the caller.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,

    /// Total charged for the order, stored exactly as supplied.
    pub total_amount: Decimal,

    /// Initial line items; must not be empty.
    pub items: Vec<NewItem>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command without a phone number.
    pub fn new(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        total_amount: Decimal,
        items: Vec<NewItem>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            customer_phone: None,
            total_amount,
            items,
        }
    }

    /// Sets the customer phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }
}

/// One incoming item in an update payload.
///
/// A change carrying an `id` edits that existing item in place, keeping
/// its identity; a change without one inserts a new item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemChange {
    pub id: Option<ItemId>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl ItemChange {
    /// A change targeting an existing item.
    pub fn existing(
        id: ItemId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: Some(id),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// A change inserting a brand new item.
    pub fn added(product_name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            id: None,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

/// Command to edit a non-terminal order.
///
/// `None` fields are left untouched. `customer_phone` is doubly
/// optional so the phone can be cleared (`Some(None)`) as well as
/// replaced. When `items` is present it is the complete replacement
/// list for the order; existing items omitted from it are deleted.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<Option<String>>,
    pub total_amount: Option<Decimal>,
    pub items: Option<Vec<ItemChange>>,
}

/// Command to move an order to a new status.
#[derive(Debug, Clone)]
pub struct ChangeStatus {
    pub status: OrderStatus,

    /// Audit message recorded for cancellations and returns. When
    /// omitted, a per-status default is substituted.
    pub message: Option<String>,
}

impl ChangeStatus {
    /// Creates a new ChangeStatus command without a message.
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    /// Creates a new ChangeStatus command carrying an audit message.
    pub fn with_message(status: OrderStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}
