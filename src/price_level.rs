//! Price Level - Aggregate resting quantity at a single price point.
//!
//! The book does not track individual orders: a level is just the sum of
//! everything resting at one price on one side.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exact decimal price. Totally ordered, so it can key a `BTreeMap`.
pub type Price = Decimal;

/// Signed quantity. Signed so that `add` can express cancels as negative deltas.
pub type Qty = i64;

/// A `(price, quantity)` pair read from one side of the book.
///
/// While a level is stored in a book its quantity is always > 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    /// Price of the level
    pub price: Price,
    /// Aggregate resting quantity
    pub qty: Qty,
}

impl Level {
    /// Create a level
    #[inline]
    pub const fn new(price: Price, qty: Qty) -> Self {
        Self { price, qty }
    }

    /// Price times quantity
    #[inline]
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.qty)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} x {}", self.price, self.qty)
    }
}
