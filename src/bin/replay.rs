//! Replay a quote file through the ring into the engine and report spreads.
//!
//! ```text
//! [Feed Thread] --> [MPMC Ring<Command>] --> [Main Thread: Engine + SpreadTracker] --> [CSV report]
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use crossbeam::utils::Backoff;
use flash_book::{
    Command, CsvReplayFeed, Engine, MarketDataFeed, MpmcRing, Price, SpreadTracker, Symbol,
};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay quotes through the ring and the book")]
struct Args {
    /// Quote file: timestamp_ns,symbol,bid,ask,bid_size,ask_size (with header)
    #[arg(short, long)]
    input: PathBuf,

    /// Spread report destination (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rolling window for the mean spread
    #[arg(short, long, default_value_t = 100)]
    window: usize,

    /// Ring capacity (rounded up to a power of two)
    #[arg(long, default_value_t = 4096)]
    ring_capacity: usize,

    /// Pin the engine (main) thread to the last core
    #[arg(long, default_value_t = false)]
    pin: bool,

    /// Log level when RUST_LOG is unset
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// One line of the spread report
#[derive(Serialize)]
struct SpreadRow {
    timestamp: String,
    symbol: Symbol,
    bid: Price,
    ask: Price,
    spread: Price,
    mid: Price,
    bps: Decimal,
    roll_mean_spread: Price,
}

fn iso8601(ts_ns: u64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(ts_ns.min(i64::MAX as u64) as i64)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Feed thread: read every quote and push it into the ring, spinning when full.
fn spawn_feed(
    mut feed: CsvReplayFeed<std::fs::File>,
    ring: Arc<MpmcRing<Command>>,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<flash_book::Result<u64>> {
    thread::spawn(move || {
        let backoff = Backoff::new();
        let result = loop {
            match feed.next_quote() {
                Ok(Some(quote)) => {
                    let mut cmd = Command::Quote(quote);
                    while let Err(back) = ring.enqueue(cmd) {
                        cmd = back;
                        backoff.snooze();
                    }
                    backoff.reset();
                }
                Ok(None) => break Ok(feed.replayed()),
                Err(e) => break Err(e),
            }
        };
        done.store(true, Ordering::Release);
        result
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    flash_book::logging::init_logging(&args.log_level);

    let feed = CsvReplayFeed::open(&args.input)?;
    let ring = Arc::new(MpmcRing::with_capacity(args.ring_capacity));
    let done = Arc::new(AtomicBool::new(false));

    info!(input = %args.input.display(), capacity = ring.capacity(), window = args.window, "replay started");

    let sink: Box<dyn std::io::Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut report = csv::Writer::from_writer(sink);

    let producer = spawn_feed(feed, ring.clone(), done.clone());

    let mut engine = Engine::new();
    if args.pin {
        engine.pin_to_core();
    }
    let mut trackers: FxHashMap<Symbol, SpreadTracker> = FxHashMap::default();
    let backoff = Backoff::new();
    let mut rows = 0u64;

    loop {
        // Sampled before polling so a final empty poll really means drained
        let feed_done = done.load(Ordering::Acquire);

        let Some(cmd) = ring.dequeue() else {
            if feed_done {
                break;
            }
            backoff.snooze();
            continue;
        };
        backoff.reset();

        let ts_ns = match &cmd {
            Command::Quote(q) => q.ts_ns,
            _ => 0,
        };
        let symbol = *cmd.symbol();
        engine.process_command(cmd);

        let Some(book) = engine.book(&symbol) else {
            continue;
        };
        let tracker = trackers
            .entry(symbol)
            .or_insert_with(|| SpreadTracker::new(args.window));
        if let Some(sample) = tracker.observe(book) {
            report.serialize(SpreadRow {
                timestamp: iso8601(ts_ns),
                symbol,
                bid: sample.bid,
                ask: sample.ask,
                spread: sample.spread,
                mid: sample.mid,
                bps: sample.bps.round_dp(6),
                roll_mean_spread: sample.rolling_mean.round_dp(10),
            })?;
            rows += 1;
        }
    }
    report.flush()?;

    match producer.join() {
        Ok(Ok(quotes)) => info!(quotes, rows, symbols = engine.symbol_count(), "replay finished"),
        Ok(Err(e)) => {
            error!(error = %e, "replay aborted");
            return Err(e.into());
        }
        Err(_) => return Err("feed thread panicked".into()),
    }

    Ok(())
}
