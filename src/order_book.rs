//! Order Book - Aggregated price-level book.
//!
//! Two ordered maps of price -> resting quantity, one per side. Both maps
//! are ascending by price, so the best bid is the last bid key and the best
//! ask is the first ask key.
//!
//! The book has no internal synchronization. Every mutator takes
//! `&mut self`, so a book can only be changed by whoever owns it
//! exclusively (in practice the single engine thread draining the ring).

use std::collections::btree_map::{Entry, OccupiedEntry};
use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::command::Side;
use crate::price_level::{Level, Price, Qty};

/// Number of levels printed per side by the `Display` impl
pub const SNAPSHOT_DEPTH: usize = 5;

/// Price -> aggregate quantity for one side
type SideMap = BTreeMap<Price, Qty>;

/// Aggregated limit order book.
///
/// Stored quantities are always > 0: a level that would drop to zero or
/// below is removed instead.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    /// Bid levels (buy interest)
    bids: SideMap,
    /// Ask levels (sell interest)
    asks: SideMap,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn side(&self, side: Side) -> &SideMap {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> &mut SideMap {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    // ========================================================================
    // Liquidity
    // ========================================================================

    /// Adjust the resting quantity at `price` on `side` by `delta`.
    ///
    /// Positive deltas add liquidity, negative deltas cancel it. A missing
    /// level is only created for a positive delta; a level whose quantity
    /// reaches zero or less is removed.
    pub fn add(&mut self, side: Side, price: Price, delta: Qty) {
        match self.side_mut(side).entry(price) {
            Entry::Vacant(vacant) => {
                if delta > 0 {
                    vacant.insert(delta);
                }
            }
            Entry::Occupied(mut level) => {
                let qty = level.get().saturating_add(delta);
                if qty <= 0 {
                    level.remove();
                } else {
                    *level.get_mut() = qty;
                }
            }
        }
    }

    /// Mutable handle on the best level of a side (highest bid, lowest ask).
    #[inline]
    pub(crate) fn best_entry(&mut self, side: Side) -> Option<OccupiedEntry<'_, Price, Qty>> {
        match side {
            Side::Bid => self.bids.last_entry(),
            Side::Ask => self.asks.first_entry(),
        }
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Best level on a side: highest bid or lowest ask.
    #[inline]
    pub fn best(&self, side: Side) -> Option<Level> {
        let entry = match side {
            Side::Bid => self.bids.last_key_value(),
            Side::Ask => self.asks.first_key_value(),
        };
        entry.map(|(&price, &qty)| Level::new(price, qty))
    }

    /// Best bid price (highest buy price)
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.last_key_value().map(|(&price, _)| price)
    }

    /// Best ask price (lowest sell price)
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(&price, _)| price)
    }

    /// Best ask minus best bid. `None` unless both sides are populated.
    ///
    /// Not clamped: a crossed book yields a zero or negative spread. A
    /// difference beyond `Decimal`'s range saturates at `Decimal::MAX` /
    /// `Decimal::MIN`.
    pub fn spread(&self) -> Option<Price> {
        Some(spread_of(self.best_bid()?, self.best_ask()?))
    }

    /// Mean of best bid and best ask. `None` unless both sides are populated.
    pub fn mid(&self) -> Option<Price> {
        Some(mid_of(self.best_bid()?, self.best_ask()?))
    }

    // ========================================================================
    // Depth
    // ========================================================================

    /// Levels of a side, best first.
    pub fn levels(&self, side: Side) -> Box<dyn Iterator<Item = Level> + '_> {
        let to_level = |(&price, &qty): (&Price, &Qty)| Level::new(price, qty);
        match side {
            Side::Bid => Box::new(self.bids.iter().rev().map(to_level)),
            Side::Ask => Box::new(self.asks.iter().map(to_level)),
        }
    }

    /// Top `n` levels of a side, best first.
    pub fn depth(&self, side: Side, n: usize) -> Vec<Level> {
        self.levels(side).take(n).collect()
    }

    /// Resting quantity at a price (0 if no level)
    #[inline]
    pub fn depth_at(&self, side: Side, price: Price) -> Qty {
        self.side(side).get(&price).copied().unwrap_or(0)
    }

    /// Total resting quantity on a side, saturating at `Qty::MAX`
    pub fn total_qty(&self, side: Side) -> Qty {
        self.side(side).values().fold(0, |acc, &qty| acc.saturating_add(qty))
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Get the number of bid levels
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Get the number of ask levels
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Clear all levels from the book
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

/// `ask - bid`, saturating at the ends of `Decimal`'s range.
pub(crate) fn spread_of(bid: Price, ask: Price) -> Price {
    ask.checked_sub(bid)
        .unwrap_or(if ask > bid { Decimal::MAX } else { Decimal::MIN })
}

/// `(bid + ask) / 2` without overflowing.
pub(crate) fn mid_of(bid: Price, ask: Price) -> Price {
    // Sum overflows only when both share a sign, and then the
    // difference cannot: step half of it away from the bid instead.
    bid.checked_add(ask)
        .map(|sum| sum / Decimal::TWO)
        .or_else(|| {
            ask.checked_sub(bid)
                .and_then(|diff| bid.checked_add(diff / Decimal::TWO))
        })
        .unwrap_or(bid)
}

impl fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .finish()
    }
}

/// Top-of-book snapshot, best levels first on each side.
impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--BIDS--")?;
        for level in self.levels(Side::Bid).take(SNAPSHOT_DEPTH) {
            writeln!(f, "{level}")?;
        }
        writeln!(f, "--ASKS--")?;
        for level in self.levels(Side::Ask).take(SNAPSHOT_DEPTH) {
            writeln!(f, "{level}")?;
        }
        Ok(())
    }
}
