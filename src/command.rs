//! Command and Event types for the engine.
//!
//! Commands are what producers push into the ring.
//! Events are what the engine hands back to downstream consumers.
//!
//! Everything here is `Copy` so ring slots never own heap memory.

use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::price_level::{Price, Qty};

/// Order side (bid = buy, ask = sell)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Bid = 0,
    /// Sell side (asks)
    Ask = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// True for the buy side
    #[inline]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Bid)
    }
}

/// Maximum symbol length in bytes
pub const SYMBOL_CAPACITY: usize = 16;

/// Inline instrument symbol (e.g. `BTCUSDT`)
pub type Symbol = ArrayString<SYMBOL_CAPACITY>;

/// Build a [`Symbol`], rejecting names longer than [`SYMBOL_CAPACITY`].
pub fn symbol(name: &str) -> Result<Symbol> {
    ArrayString::from(name).map_err(|_| Error::SymbolTooLong(name.to_owned()))
}

// ============================================================================
// Input Commands
// ============================================================================

/// Top-of-book quote from a market data source.
///
/// Field order matches the replay file layout:
/// `timestamp_ns,symbol,bid,ask,bid_size,ask_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange or capture time in nanoseconds
    pub ts_ns: u64,
    /// Instrument
    pub symbol: Symbol,
    /// Best bid price
    pub bid: Price,
    /// Best ask price
    pub ask: Price,
    /// Quantity at the best bid
    pub bid_size: Qty,
    /// Quantity at the best ask
    pub ask_size: Qty,
}

/// Change the resting quantity at one price
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Liquidity {
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    /// Positive adds liquidity, negative cancels it
    pub delta: Qty,
}

/// Incoming aggressive order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TakerOrder {
    pub symbol: Symbol,
    /// Side of the taker (Bid consumes asks)
    pub side: Side,
    /// Worst price the taker accepts
    pub price: Price,
    /// Requested quantity
    pub qty: Qty,
    /// Submission time in nanoseconds
    pub ts_ns: u64,
}

/// Input commands carried by the ring
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replace the symbol's book with a top-of-book quote
    Quote(Quote),
    /// Add or remove resting liquidity
    Add(Liquidity),
    /// Match a taker against resting liquidity
    Match(TakerOrder),
    /// Drop every level of a symbol's book
    Clear(Symbol),
}

impl Command {
    /// Symbol this command applies to
    #[inline]
    pub fn symbol(&self) -> &Symbol {
        match self {
            Command::Quote(q) => &q.symbol,
            Command::Add(l) => &l.symbol,
            Command::Match(t) => &t.symbol,
            Command::Clear(s) => s,
        }
    }
}

// ============================================================================
// Output Events
// ============================================================================

/// Result of matching a taker order.
///
/// Only the aggregate filled quantity is reported, not per-level fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub symbol: Symbol,
    /// Side of the taker order
    pub side: Side,
    /// Taker's limit price
    pub price: Price,
    /// Quantity the taker asked for
    pub requested: Qty,
    /// Quantity actually filled (0 when not marketable)
    pub filled: Qty,
    /// Taker submission time in nanoseconds
    pub ts_ns: u64,
}

impl Execution {
    /// True if nothing was filled
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Quantity left unfilled
    #[inline]
    pub fn remaining(&self) -> Qty {
        (self.requested - self.filled).max(0)
    }
}

/// Output events from the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    /// A taker order was matched
    Execution(Execution),
}
