//! Cash and position bookkeeping driven by fills.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::command::{Side, Symbol};
use crate::price_level::{Price, Qty};
use crate::router::Fill;

/// Accumulator of fills.
pub trait Ledger {
    /// Apply one fill of `qty` at `price`.
    fn on_fill(&mut self, symbol: Symbol, side: Side, qty: Qty, price: Price);

    /// Apply a routed fill report.
    fn apply(&mut self, fill: &Fill) {
        self.on_fill(fill.symbol, fill.side, fill.qty, fill.price);
    }
}

/// Net holding in one symbol
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Signed quantity (negative when short)
    pub qty: Qty,
    /// Average cost of the quantity bought, 0 when flat
    pub avg_price: Price,
}

/// Cash plus average-cost positions.
#[derive(Clone, Debug, Default)]
pub struct Wallet {
    cash: Decimal,
    positions: FxHashMap<Symbol, Position>,
}

impl Wallet {
    /// Wallet with a starting cash balance
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            positions: FxHashMap::default(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Position in a symbol (flat if never traded)
    pub fn position(&self, symbol: &Symbol) -> Position {
        self.positions.get(symbol).copied().unwrap_or_default()
    }

    /// Every symbol touched so far
    pub fn positions(&self) -> impl Iterator<Item = (&Symbol, &Position)> {
        self.positions.iter()
    }
}

impl Ledger for Wallet {
    fn on_fill(&mut self, symbol: Symbol, side: Side, qty: Qty, price: Price) {
        let notional = price * Decimal::from(qty);
        let pos = self.positions.entry(symbol).or_default();

        match side {
            Side::Bid => {
                self.cash -= notional;
                let cost = pos.avg_price * Decimal::from(pos.qty) + notional;
                pos.qty += qty;
                pos.avg_price = if pos.qty != 0 {
                    cost / Decimal::from(pos.qty)
                } else {
                    Decimal::ZERO
                };
            }
            Side::Ask => {
                self.cash += notional;
                pos.qty -= qty;
                if pos.qty == 0 {
                    pos.avg_price = Decimal::ZERO;
                }
            }
        }

        debug!(%symbol, ?side, qty, %price, position = pos.qty, cash = %self.cash, "fill applied");
    }
}
