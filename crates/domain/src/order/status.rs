//! Order status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Allowed transitions:
///
/// ```text
/// CREATED   -> CONFIRMED | CANCELLED
/// CONFIRMED -> SHIPPED   | CANCELLED
/// SHIPPED   -> DELIVERED | RETURNED
/// DELIVERED -> RETURNED
/// ```
///
/// `CANCELLED` and `RETURNED` are terminal: once reached, the order can
/// no longer be edited or transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Created,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    /// Returns the statuses this one may transition into.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Created => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered, OrderStatus::Returned],
            OrderStatus::Delivered => &[OrderStatus::Returned],
            OrderStatus::Cancelled | OrderStatus::Returned => &[],
        }
    }

    /// Returns true if this status may transition into `next`.
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns true if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Returns true if entering this status appends a status log entry.
    pub fn requires_audit_log(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// The log message substituted when the caller supplies none.
    ///
    /// Only statuses that require an audit log have one.
    pub fn default_audit_message(&self) -> Option<&'static str> {
        match self {
            OrderStatus::Cancelled => Some("Cancelled by the system or the customer."),
            OrderStatus::Returned => Some("Returned after shipping."),
            _ => None,
        }
    }

    /// Wire name of the status, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "RETURNED" => Ok(OrderStatus::Returned),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error returned when a stored status name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_created_transitions() {
        let status = OrderStatus::Created;
        assert!(status.can_transition(OrderStatus::Confirmed));
        assert!(status.can_transition(OrderStatus::Cancelled));
        assert!(!status.can_transition(OrderStatus::Shipped));
        assert!(!status.can_transition(OrderStatus::Delivered));
        assert!(!status.can_transition(OrderStatus::Returned));
        assert!(!status.can_transition(OrderStatus::Created));
    }

    #[test]
    fn test_confirmed_transitions() {
        let status = OrderStatus::Confirmed;
        assert!(status.can_transition(OrderStatus::Shipped));
        assert!(status.can_transition(OrderStatus::Cancelled));
        assert!(!status.can_transition(OrderStatus::Delivered));
        assert!(!status.can_transition(OrderStatus::Created));
    }

    #[test]
    fn test_shipped_transitions() {
        let status = OrderStatus::Shipped;
        assert!(status.can_transition(OrderStatus::Delivered));
        assert!(status.can_transition(OrderStatus::Returned));
        assert!(!status.can_transition(OrderStatus::Cancelled));
        assert!(!status.can_transition(OrderStatus::Confirmed));
    }

    #[test]
    fn test_delivered_can_only_be_returned() {
        let status = OrderStatus::Delivered;
        assert_eq!(status.allowed_transitions(), &[OrderStatus::Returned]);
    }

    #[test]
    fn test_terminal_statuses_allow_nothing() {
        for status in [OrderStatus::Cancelled, OrderStatus::Returned] {
            assert!(status.allowed_transitions().is_empty());
            for next in OrderStatus::ALL {
                assert!(!status.can_transition(next));
            }
        }
    }

    #[test]
    fn test_only_cancelled_and_returned_are_terminal() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Returned.is_terminal());
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_audit_log_required_only_on_cancel_and_return() {
        for status in OrderStatus::ALL {
            assert_eq!(status.requires_audit_log(), status.is_terminal());
            assert_eq!(status.default_audit_message().is_some(), status.requires_audit_log());
        }
    }

    #[test]
    fn test_display_uses_wire_names() {
        assert_eq!(OrderStatus::Created.to_string(), "CREATED");
        assert_eq!(OrderStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_from_str_round_trips() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_from_str_rejects_unknown_names() {
        assert!("PENDING".parse::<OrderStatus>().is_err());
        assert!("created".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"SHIPPED\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Shipped);
    }
}
