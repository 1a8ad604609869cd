//! Order numbers.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Customer-facing order number: the literal prefix `ES` followed by
/// six decimal digits, e.g. `ES483920`.
///
/// Numbers are drawn at random rather than sequentially. Uniqueness is
/// not guaranteed by construction; the creating transaction inserts
/// speculatively and retries on a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "ES";
    const MIN: u32 = 100_000;
    const MAX: u32 = 999_999;

    /// Draws a random order number in the `ES100000..=ES999999` range.
    pub fn random() -> Self {
        let digits = rand::thread_rng().gen_range(Self::MIN..=Self::MAX);
        OrderNumber(format!("{}{digits}", Self::PREFIX))
    }

    /// Parses a stored order number, validating its shape.
    pub fn parse(s: &str) -> Result<Self, InvalidOrderNumber> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| InvalidOrderNumber(s.to_string()))?;
        if digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()) {
            Ok(OrderNumber(s.to_string()))
        } else {
            Err(InvalidOrderNumber(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderNumber::parse(s)
    }
}

/// Error returned when an order number does not match `ES` + six digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOrderNumber(pub String);

impl std::fmt::Display for InvalidOrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid order number: {:?}", self.0)
    }
}

impl std::error::Error for InvalidOrderNumber {}
