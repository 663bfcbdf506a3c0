//! Engine - Single-writer consumer between the ring and the books.
//!
//! Producers push [`Command`]s into an [`MpmcRing`]; exactly one engine
//! drains it and applies every command to the per-symbol [`OrderBook`]s it
//! owns. Owning the books by value is what makes their lock-free, non-atomic
//! state safe: no other thread can reach them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::utils::Backoff;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::command::{Command, Execution, OutputEvent, Quote, Side, Symbol};
use crate::order_book::OrderBook;
use crate::price_level::Price;
use crate::ring::MpmcRing;

/// Counters kept by the engine while it runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Commands applied
    pub commands: u64,
    /// Match commands processed
    pub executions: u64,
    /// Total quantity filled across all executions
    pub filled_qty: i64,
    /// Output events dropped because the output ring was full
    pub dropped_events: u64,
}

/// The engine that owns every book and processes commands.
pub struct Engine {
    /// One book per symbol
    books: FxHashMap<Symbol, OrderBook>,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine with no books
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an engine with room for `symbols` books before rehashing.
    pub fn with_capacity(symbols: usize) -> Self {
        Self {
            books: FxHashMap::with_capacity_and_hasher(symbols, Default::default()),
            stats: EngineStats::default(),
        }
    }

    /// Run the engine event loop.
    ///
    /// # Arguments
    /// * `input` - Ring of commands filled by producers
    /// * `output` - Ring receiving executions (best effort, dropped if full)
    /// * `shutdown` - Set by the owner once all producers are done
    /// * `pin_to_core` - Whether to pin to the last available CPU core
    ///
    /// Busy-polls with backoff. Returns once `shutdown` is observed and
    /// the input ring has been drained.
    pub fn run(
        &mut self,
        input: &MpmcRing<Command>,
        output: &MpmcRing<OutputEvent>,
        shutdown: &AtomicBool,
        pin_to_core: bool,
    ) -> EngineStats {
        if pin_to_core {
            self.pin_to_core();
        }

        info!(
            input_capacity = input.capacity(),
            output_capacity = output.capacity(),
            "engine started"
        );

        let backoff = Backoff::new();
        loop {
            if self.drain(input, output) > 0 {
                backoff.reset();
                continue;
            }

            if shutdown.load(Ordering::Acquire) {
                // Producers are done: pick up anything published in between
                self.drain(input, output);
                break;
            }

            backoff.snooze();
        }

        if self.stats.dropped_events > 0 {
            warn!(dropped = self.stats.dropped_events, "output ring overflowed");
        }
        info!(
            commands = self.stats.commands,
            executions = self.stats.executions,
            filled = self.stats.filled_qty,
            "engine stopped"
        );

        self.stats
    }

    /// Apply every command currently visible in `input`.
    ///
    /// # Returns
    /// Number of commands applied.
    pub fn drain(&mut self, input: &MpmcRing<Command>, output: &MpmcRing<OutputEvent>) -> usize {
        let mut applied = 0;
        while let Some(cmd) = input.dequeue() {
            applied += 1;
            if let Some(event) = self.process_command(cmd) {
                // Best effort - drop if full
                if output.enqueue(event).is_err() {
                    self.stats.dropped_events += 1;
                }
            }
        }
        applied
    }

    /// Process a single command and return its output event, if any.
    ///
    /// This is the main entry point for synchronous usage (testing, benchmarks).
    #[inline]
    pub fn process_command(&mut self, cmd: Command) -> Option<OutputEvent> {
        self.stats.commands += 1;

        match cmd {
            Command::Quote(quote) => {
                self.apply_quote(quote);
                None
            }
            Command::Add(liq) => {
                self.books
                    .entry(liq.symbol)
                    .or_default()
                    .add(liq.side, liq.price, liq.delta);
                None
            }
            Command::Match(taker) => {
                let filled = self
                    .books
                    .get_mut(&taker.symbol)
                    .map_or(0, |book| book.match_taker(taker.side, taker.price, taker.qty));

                self.stats.executions += 1;
                self.stats.filled_qty += filled;

                Some(OutputEvent::Execution(Execution {
                    symbol: taker.symbol,
                    side: taker.side,
                    price: taker.price,
                    requested: taker.qty,
                    filled,
                    ts_ns: taker.ts_ns,
                }))
            }
            Command::Clear(symbol) => {
                if let Some(book) = self.books.get_mut(&symbol) {
                    book.clear();
                }
                None
            }
        }
    }

    /// Replace a symbol's book with the quote's top of book.
    fn apply_quote(&mut self, quote: Quote) {
        let book = self.books.entry(quote.symbol).or_default();
        book.clear();
        book.add(Side::Bid, quote.bid, quote.bid_size);
        book.add(Side::Ask, quote.ask, quote.ask_size);
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) {
        match core_affinity::get_core_ids().and_then(|ids| ids.last().copied()) {
            Some(core) => {
                if core_affinity::set_for_current(core) {
                    debug!(core = core.id, "engine pinned");
                } else {
                    warn!(core = core.id, "failed to pin engine thread");
                }
            }
            None => warn!("no core ids available, engine not pinned"),
        }
    }

    /// Book for a symbol, if any command touched it.
    #[inline]
    pub fn book(&self, symbol: &Symbol) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Get the best bid price of a symbol.
    #[inline]
    pub fn best_bid(&self, symbol: &Symbol) -> Option<Price> {
        self.book(symbol).and_then(OrderBook::best_bid)
    }

    /// Get the best ask price of a symbol.
    #[inline]
    pub fn best_ask(&self, symbol: &Symbol) -> Option<Price> {
        self.book(symbol).and_then(OrderBook::best_ask)
    }

    /// Get the spread of a symbol.
    #[inline]
    pub fn spread(&self, symbol: &Symbol) -> Option<Price> {
        self.book(symbol).and_then(OrderBook::spread)
    }

    /// Number of books held.
    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.books.len()
    }

    /// Counters accumulated so far.
    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Compute state hash for determinism testing.
    ///
    /// Independent of hash map iteration order.
    pub fn state_hash(&self) -> u64 {
        let mut symbols: Vec<&Symbol> = self.books.keys().collect();
        symbols.sort_unstable();

        let mut hasher = DefaultHasher::new();
        for symbol in symbols {
            symbol.as_str().hash(&mut hasher);
            let book = &self.books[symbol];
            for side in [Side::Bid, Side::Ask] {
                side.hash(&mut hasher);
                for level in book.levels(side) {
                    level.price.normalize().hash(&mut hasher);
                    level.qty.hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
