//! # Flash-Book
//!
//! Two low-latency trading primitives that compose through a single
//! consumer thread.
//!
//! ## Design Principles
//!
//! - **Lock-Free Hand-off**: Bounded MPMC ring with per-slot sequence counters
//! - **Single-Writer Book**: The engine owns every book; no locks on the matching path
//! - **Price Priority**: Takers walk the opposite side best price first
//! - **Total Functions**: Full/empty rings and degenerate orders are return values, not errors
//!
//! ## Architecture
//!
//! ```text
//! [Feed Threads] --> [MPMC Ring<Command>] --> [Engine Thread (Pinned)] --> [MPMC Ring<OutputEvent>]
//!                                                    |
//!                                          [OrderBook per symbol]
//! ```

pub mod command;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod logging;
pub mod matching;
pub mod order_book;
pub mod price_level;
pub mod ring;
pub mod router;
pub mod spread;

// Re-exports for convenience
pub use command::{
    symbol, Command, Execution, Liquidity, OutputEvent, Quote, Side, Symbol, TakerOrder,
};
pub use engine::{Engine, EngineStats};
pub use error::{Error, Result};
pub use feed::{CsvReplayFeed, MarketDataFeed};
pub use ledger::{Ledger, Position, Wallet};
pub use order_book::OrderBook;
pub use price_level::{Level, Price, Qty};
pub use ring::MpmcRing;
pub use router::{Fill, NewOrder, OrderId, OrderRouter, PaperRouter};
pub use spread::{SpreadSample, SpreadTracker};
