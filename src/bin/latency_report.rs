use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use flash_book::{symbol, Command, Engine, Liquidity, MpmcRing, OutputEvent, Side, TakerOrder};
use hdrhistogram::Histogram;
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "latency-report", about = "Latency histograms for the ring and the book")]
struct Args {
    /// Operations measured per section
    #[arg(short, long, default_value_t = 1_000_000)]
    iterations: u64,

    /// Ring capacity (rounded up to a power of two)
    #[arg(short, long, default_value_t = 65_536)]
    ring_capacity: usize,

    /// Producer threads for the end-to-end section
    #[arg(short, long, default_value_t = 2)]
    producers: u64,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn print_report(title: &str, histogram: &Histogram<u64>, total: std::time::Duration) {
    println!("\n=== {} (ns) ===", title);
    println!("Total Ops:  {}", histogram.len());
    println!(
        "Throughput: {:.2} ops/sec",
        histogram.len() as f64 / total.as_secs_f64()
    );
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
}

/// Enqueue + dequeue round trip on one thread
fn ring_round_trip(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let ring = MpmcRing::with_capacity(args.ring_capacity);
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3)?;
    let mut total = std::time::Duration::ZERO;

    for i in 0..args.iterations {
        let start = Instant::now();
        let _ = std::hint::black_box(ring.enqueue(i));
        std::hint::black_box(ring.dequeue());
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total += elapsed;
    }

    print_report("Ring Round Trip", &histogram, total);
    Ok(())
}

/// Single-level match followed by a replenishing add
fn book_match(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let sym = symbol("BTCUSDT")?;
    let price = Decimal::new(10000, 2);
    let mut engine = Engine::with_capacity(1);
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3)?;
    let mut total = std::time::Duration::ZERO;

    let replenish = Command::Add(Liquidity { symbol: sym, side: Side::Ask, price, delta: 100 });
    let taker = Command::Match(TakerOrder { symbol: sym, side: Side::Bid, price, qty: 100, ts_ns: 0 });
    engine.process_command(replenish);

    for _ in 0..args.iterations {
        let start = Instant::now();
        std::hint::black_box(engine.process_command(taker));
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total += elapsed;
        engine.process_command(replenish);
    }

    print_report("Book Match", &histogram, total);
    Ok(())
}

/// Producers push timestamped takers, the engine thread applies them,
/// the main thread measures enqueue-to-execution latency.
fn end_to_end(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let sym = symbol("BTCUSDT")?;
    let input = Arc::new(MpmcRing::with_capacity(args.ring_capacity));
    let output = Arc::new(MpmcRing::with_capacity(args.ring_capacity));
    let shutdown = Arc::new(AtomicBool::new(false));
    let epoch = Instant::now();
    let per_producer = args.iterations / args.producers.max(1);

    let engine = {
        let (input, output, shutdown) = (input.clone(), output.clone(), shutdown.clone());
        thread::spawn(move || {
            let mut engine = Engine::with_capacity(1);
            engine.run(&input, &output, &shutdown, true)
        })
    };

    let producers: Vec<_> = (0..args.producers.max(1))
        .map(|_| {
            let input = input.clone();
            thread::spawn(move || {
                for _ in 0..per_producer {
                    let mut cmd = Command::Match(TakerOrder {
                        symbol: sym,
                        side: Side::Bid,
                        price: Decimal::ONE,
                        qty: 1,
                        ts_ns: epoch.elapsed().as_nanos() as u64,
                    });
                    while let Err(back) = input.enqueue(cmd) {
                        cmd = back;
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 10_000_000, 3)?;
    let started = Instant::now();
    loop {
        // Sampled before polling so a final empty poll really means drained
        let engine_done = engine.is_finished();
        match output.dequeue() {
            Some(OutputEvent::Execution(exec)) => {
                let now = epoch.elapsed().as_nanos() as u64;
                histogram.saturating_record(now.saturating_sub(exec.ts_ns));
            }
            None if engine_done => break,
            None => {
                if producers.iter().all(|p| p.is_finished()) {
                    shutdown.store(true, Ordering::Release);
                }
                std::hint::spin_loop();
            }
        }
    }
    let total = started.elapsed();

    for handle in producers {
        handle.join().map_err(|_| "producer panicked")?;
    }
    let stats = engine.join().map_err(|_| "engine panicked")?;

    print_report("End To End", &histogram, total);
    println!("Engine: {:?}", stats);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    flash_book::logging::init_logging(&args.log_level);

    println!("Running {} iterations per section...", args.iterations);

    ring_round_trip(&args)?;
    book_match(&args)?;
    end_to_end(&args)?;

    Ok(())
}
