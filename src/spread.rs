//! Rolling spread statistics over a stream of book observations.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::order_book::{mid_of, spread_of, OrderBook};
use crate::price_level::Price;

/// One observation of a book's top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SpreadSample {
    pub bid: Price,
    pub ask: Price,
    /// `ask - bid`
    pub spread: Price,
    /// `(bid + ask) / 2`
    pub mid: Price,
    /// Spread in basis points of mid, 0 when mid is not positive
    pub bps: Decimal,
    /// Mean spread over the tracker's window, this sample included
    pub rolling_mean: Price,
}

/// Fixed-window rolling mean of the bid/ask spread.
#[derive(Clone, Debug)]
pub struct SpreadTracker {
    window: usize,
    spreads: VecDeque<Price>,
}

impl SpreadTracker {
    /// Create a tracker averaging over the last `window` samples (at least 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            spreads: VecDeque::with_capacity(window),
        }
    }

    /// Record the book's current top.
    ///
    /// # Returns
    /// `None` without touching the window if either side is empty.
    pub fn observe(&mut self, book: &OrderBook) -> Option<SpreadSample> {
        let bid = book.best_bid()?;
        let ask = book.best_ask()?;
        Some(self.record(bid, ask))
    }

    /// Record a raw bid/ask pair.
    pub fn record(&mut self, bid: Price, ask: Price) -> SpreadSample {
        let spread = spread_of(bid, ask);
        let mid = mid_of(bid, ask);
        let bps = if mid > Decimal::ZERO {
            spread
                .checked_div(mid)
                .and_then(|ratio| ratio.checked_mul(Decimal::from(10_000)))
                .unwrap_or(Decimal::MAX)
        } else {
            Decimal::ZERO
        };

        self.spreads.push_back(spread);
        if self.spreads.len() > self.window {
            self.spreads.pop_front();
        }

        SpreadSample {
            bid,
            ask,
            spread,
            mid,
            bps,
            rolling_mean: self.rolling_mean(),
        }
    }

    /// Mean spread of the current window (0 when nothing recorded).
    pub fn rolling_mean(&self) -> Price {
        if self.spreads.is_empty() {
            return Decimal::ZERO;
        }
        let n = Decimal::from(self.spreads.len());
        let sum = self
            .spreads
            .iter()
            .try_fold(Decimal::ZERO, |acc, &spread| acc.checked_add(spread));
        match sum {
            Some(sum) => sum / n,
            // Divide first once the window total leaves Decimal's range
            None => self
                .spreads
                .iter()
                .fold(Decimal::ZERO, |acc, &spread| acc.saturating_add(spread / n)),
        }
    }

    /// Samples currently in the window
    pub fn len(&self) -> usize {
        self.spreads.len()
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.spreads.is_empty()
    }

    /// Configured window length
    pub fn window(&self) -> usize {
        self.window
    }
}
