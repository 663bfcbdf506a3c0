//! Matching - Taker orders against resting liquidity.
//!
//! A taker walks the opposite side from its best level outward:
//! 1. CROSS CHECK: stop as soon as the best opposite price is worse than the limit
//! 2. CONSUME: take `min(remaining, level qty)` from that level
//! 3. CLEANUP: remove the level once it is fully consumed
//!
//! Nothing rests afterwards; unfilled quantity is simply reported back.

use crate::command::Side;
use crate::order_book::OrderBook;
use crate::price_level::{Price, Qty};

/// Check if a taker limit price crosses a resting opposite price.
#[inline]
pub fn prices_cross(taker_side: Side, taker_price: Price, resting_price: Price) -> bool {
    match taker_side {
        // Buyer willing to pay >= lowest ask
        Side::Bid => taker_price >= resting_price,
        // Seller willing to accept <= highest bid
        Side::Ask => taker_price <= resting_price,
    }
}

impl OrderBook {
    /// Match a taker order of `qty` at limit `price` against the opposite side.
    ///
    /// A Bid taker consumes asks at or below `price`, lowest first. An Ask
    /// taker consumes bids at or above `price`, highest first.
    ///
    /// # Returns
    /// Total quantity filled, between 0 and `qty`. A non-positive `qty` is a
    /// no-op returning 0.
    pub fn match_taker(&mut self, taker: Side, price: Price, qty: Qty) -> Qty {
        if qty <= 0 {
            return 0;
        }

        let maker_side = taker.opposite();
        let mut remaining = qty;

        while remaining > 0 {
            let Some(mut level) = self.best_entry(maker_side) else {
                break; // Opposite side exhausted
            };

            if !prices_cross(taker, price, *level.key()) {
                break; // Not marketable
            }

            let take = remaining.min(*level.get());
            remaining -= take;

            let left = *level.get() - take;
            if left == 0 {
                level.remove();
            } else {
                *level.get_mut() = left;
            }
        }

        qty - remaining
    }

    /// Whether a taker at `price` would execute against at least one level.
    #[inline]
    pub fn is_marketable(&self, taker: Side, price: Price) -> bool {
        self.best(taker.opposite())
            .is_some_and(|best| prices_cross(taker, price, best.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_level::Level;
    use rust_decimal::Decimal;

    fn px(units: i64) -> Price {
        Decimal::from(units)
    }

    /// Bid 100 x 50, Ask 101 x 30
    fn seeded_book() -> OrderBook {
        let mut book = OrderBook::new();
        book.add(Side::Bid, px(100), 50);
        book.add(Side::Ask, px(101), 30);
        book
    }

    #[test]
    fn test_prices_cross() {
        assert!(prices_cross(Side::Bid, px(101), px(101)));
        assert!(prices_cross(Side::Bid, px(102), px(101)));
        assert!(!prices_cross(Side::Bid, px(100), px(101)));

        assert!(prices_cross(Side::Ask, px(100), px(100)));
        assert!(prices_cross(Side::Ask, px(99), px(100)));
        assert!(!prices_cross(Side::Ask, px(101), px(100)));
    }

    #[test]
    fn test_partial_level_consumption() {
        let mut book = seeded_book();

        assert_eq!(book.match_taker(Side::Bid, px(101), 20), 20);
        assert_eq!(book.best(Side::Ask), Some(Level::new(px(101), 10)));
        // Own side untouched
        assert_eq!(book.best(Side::Bid), Some(Level::new(px(100), 50)));
    }

    #[test]
    fn test_partial_fill_when_liquidity_short() {
        let mut book = seeded_book();
        book.match_taker(Side::Bid, px(101), 20);

        assert_eq!(book.match_taker(Side::Bid, px(101), 15), 10);
        assert_eq!(book.best(Side::Ask), None);
        assert_eq!(book.ask_levels(), 0);
    }

    #[test]
    fn test_no_resting_liquidity() {
        let mut book = OrderBook::new();
        book.add(Side::Ask, px(101), 30);
        let before = book.clone();

        assert_eq!(book.match_taker(Side::Ask, px(50), 10), 0);
        assert_eq!(book, before);
    }

    #[test]
    fn test_not_marketable() {
        let mut book = seeded_book();
        let before = book.clone();

        // Bid below best ask, ask above best bid
        assert_eq!(book.match_taker(Side::Bid, px(100), 10), 0);
        assert_eq!(book.match_taker(Side::Ask, px(101), 10), 0);
        assert_eq!(book, before);
        assert!(!book.is_marketable(Side::Bid, px(100)));
        assert!(book.is_marketable(Side::Bid, px(101)));
        assert!(book.is_marketable(Side::Ask, px(99)));
    }

    #[test]
    fn test_non_positive_qty_is_noop() {
        let mut book = seeded_book();
        let before = book.clone();

        assert_eq!(book.match_taker(Side::Bid, px(200), 0), 0);
        assert_eq!(book.match_taker(Side::Bid, px(200), -5), 0);
        assert_eq!(book, before);
    }

    #[test]
    fn test_bid_taker_walks_asks_upward() {
        let mut book = OrderBook::new();
        book.add(Side::Ask, px(101), 10);
        book.add(Side::Ask, px(102), 10);
        book.add(Side::Ask, px(103), 10);
        book.add(Side::Ask, px(104), 10);

        // Limit 103: can take three levels, stops before 104
        assert_eq!(book.match_taker(Side::Bid, px(103), 100), 30);
        assert_eq!(book.best(Side::Ask), Some(Level::new(px(104), 10)));
    }

    #[test]
    fn test_ask_taker_walks_bids_downward() {
        let mut book = OrderBook::new();
        book.add(Side::Bid, px(100), 10);
        book.add(Side::Bid, px(99), 20);
        book.add(Side::Bid, px(98), 30);

        assert_eq!(book.match_taker(Side::Ask, px(99), 25), 25);
        // 100 fully consumed, 99 partially
        assert_eq!(book.best(Side::Bid), Some(Level::new(px(99), 5)));
        assert_eq!(book.depth_at(Side::Bid, px(98)), 30);
    }

    #[test]
    fn test_exact_fill_removes_level() {
        let mut book = seeded_book();
        assert_eq!(book.match_taker(Side::Ask, px(100), 50), 50);
        assert_eq!(book.best(Side::Bid), None);
        assert_eq!(book.bid_levels(), 0);
    }

    #[test]
    fn test_empty_book_not_marketable() {
        let book = OrderBook::new();
        assert!(!book.is_marketable(Side::Bid, px(1_000_000)));
        assert!(!book.is_marketable(Side::Ask, px(0)));
    }
}
