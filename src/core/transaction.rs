//! Transaction records and the source abstraction that produces them.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Separator between the country and service halves of an item identifier.
pub const ITEM_SEPARATOR: &str = " | ";

/// Identifies a sellable product line: a normalized (country, service) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Builds the identifier from its raw source fields. Both halves are
    /// trimmed and uppercased, so the result is a pure function of the input.
    pub fn new(country: &str, service: &str) -> Self {
        ItemId(format!(
            "{}{ITEM_SEPARATOR}{}",
            country.trim().to_uppercase(),
            service.trim().to_uppercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId(value)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized transaction row.
///
/// Prices are `None` when the source value was missing or unparseable;
/// quantity and profit are already coerced to zero in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub timestamp: NaiveDateTime,
    pub buyer: String,
    pub supplier: String,
    pub item: ItemId,
    pub sell_price: Option<f64>,
    pub buy_price: Option<f64>,
    pub quantity: f64,
    pub profit: f64,
}

/// Something that can yield normalized transaction records.
pub trait TransactionSource {
    fn load(&self) -> Result<Vec<TransactionRecord>>;
}
