//! Order submission and fill reporting.
//!
//! The engine only reports aggregate filled quantity; a router is the
//! boundary that turns orders into identified fills for downstream
//! bookkeeping.

use std::collections::VecDeque;
use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::command::{Execution, Side, Symbol};
use crate::price_level::{Price, Qty};

/// Client order identifier, printed as `C<n>`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// New order request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub symbol: Symbol,
    pub price: Price,
    pub qty: Qty,
    pub side: Side,
}

impl NewOrder {
    /// Order for the filled part of an execution, at the taker's limit.
    ///
    /// `None` when nothing was filled.
    pub fn from_execution(exec: &Execution) -> Option<Self> {
        (!exec.is_empty()).then(|| Self {
            symbol: exec.symbol,
            price: exec.price,
            qty: exec.filled,
            side: exec.side,
        })
    }
}

/// Fill report for a routed order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    /// Wall-clock time of the fill in nanoseconds
    pub ts_ns: u64,
}

/// Sink for orders that later yields fills.
pub trait OrderRouter {
    /// Submit an order and get its identifier back.
    fn send(&mut self, order: &NewOrder) -> OrderId;

    /// Next pending fill, if any.
    fn poll_fill(&mut self) -> Option<Fill>;
}

/// Simulated router: every order fills immediately, in full, at its price.
#[derive(Debug, Default)]
pub struct PaperRouter {
    fills: VecDeque<Fill>,
    seq: u64,
}

impl PaperRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills not yet polled
    pub fn pending(&self) -> usize {
        self.fills.len()
    }
}

impl OrderRouter for PaperRouter {
    fn send(&mut self, order: &NewOrder) -> OrderId {
        self.seq += 1;
        let order_id = OrderId(self.seq);

        debug!(%order_id, symbol = %order.symbol, side = ?order.side, price = %order.price, qty = order.qty, "paper order");

        self.fills.push_back(Fill {
            order_id,
            symbol: order.symbol,
            side: order.side,
            price: order.price,
            qty: order.qty,
            ts_ns: now_ns(),
        });
        order_id
    }

    fn poll_fill(&mut self) -> Option<Fill> {
        self.fills.pop_front()
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |ns| ns.max(0) as u64)
}
