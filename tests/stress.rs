//! Stress Tests - Push the ring to its limits.
//!
//! These tests verify correctness under real thread contention:
//! - No loss, duplication or fabrication across many producers/consumers
//! - FIFO order with one producer and one consumer
//! - Capacity bound when the consumer stalls
//! - Tiny rings forced through millions of laps

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use flash_book::MpmcRing;

/// Push `value`, yielding until there is room.
fn push_blocking<T>(ring: &MpmcRing<T>, mut value: T) {
    while let Err(back) = ring.enqueue(value) {
        value = back;
        thread::yield_now();
    }
}

/// Run `producers` x `per_producer` unique values through `consumers`
/// threads and return every value that came out.
fn run_mpmc(capacity: usize, producers: u64, consumers: usize, per_producer: u64) -> Vec<u64> {
    let ring = MpmcRing::with_capacity(capacity);
    let done = AtomicBool::new(false);
    let start = Barrier::new(producers as usize + consumers);

    thread::scope(|s| {
        let producer_handles: Vec<_> = (0..producers)
            .map(|p| {
                let (ring, start) = (&ring, &start);
                s.spawn(move || {
                    start.wait();
                    for i in 0..per_producer {
                        // Unique across producers
                        push_blocking(ring, p * per_producer + i);
                    }
                })
            })
            .collect();

        let consumer_handles: Vec<_> = (0..consumers)
            .map(|_| {
                let (ring, done, start) = (&ring, &done, &start);
                s.spawn(move || {
                    start.wait();
                    let mut seen = Vec::new();
                    loop {
                        let finished = done.load(Ordering::Acquire);
                        match ring.dequeue() {
                            Some(v) => seen.push(v),
                            None if finished => break,
                            None => thread::yield_now(),
                        }
                    }
                    seen
                })
            })
            .collect();

        for h in producer_handles {
            h.join().unwrap();
        }
        done.store(true, Ordering::Release);

        consumer_handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    })
}

// ============================================================================
// Multiset Equality
// ============================================================================

fn assert_exact_multiset(mut values: Vec<u64>, expected_len: u64) {
    assert_eq!(values.len() as u64, expected_len, "lost or fabricated values");
    values.sort_unstable();
    for (i, v) in values.iter().enumerate() {
        assert_eq!(*v, i as u64, "duplicate or missing value near {}", i);
    }
}

#[test]
fn test_two_producers_one_consumer() {
    let out = run_mpmc(1024, 2, 1, 50_000);
    assert_exact_multiset(out, 100_000);
}

#[test]
fn test_many_producers_many_consumers() {
    let out = run_mpmc(256, 4, 4, 25_000);
    assert_exact_multiset(out, 100_000);
}

#[test]
fn test_tiny_ring_heavy_contention() {
    // Capacity 2: every value forces a lap boundary
    let out = run_mpmc(2, 4, 3, 10_000);
    assert_exact_multiset(out, 40_000);
}

#[test]
fn test_produced_equals_consumed_counters() {
    const PRODUCERS: usize = 6;
    const PER_PRODUCER: usize = 20_000;

    let ring = Arc::new(MpmcRing::with_capacity(512));
    let produced = Arc::new(AtomicUsize::new(0));
    let consumed = Arc::new(AtomicUsize::new(0));
    let sum_in = Arc::new(AtomicU64::new(0));
    let sum_out = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let (ring, produced, sum_in) = (ring.clone(), produced.clone(), sum_in.clone());
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let v = (p * PER_PRODUCER + i) as u64;
                    push_blocking(&ring, v);
                    produced.fetch_add(1, Ordering::Relaxed);
                    sum_in.fetch_add(v, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let (ring, consumed, sum_out) = (ring.clone(), consumed.clone(), sum_out.clone());
            thread::spawn(move || {
                // Drain until every value is accounted for
                while consumed.load(Ordering::Relaxed) < PRODUCERS * PER_PRODUCER {
                    match ring.dequeue() {
                        Some(v) => {
                            consumed.fetch_add(1, Ordering::Relaxed);
                            sum_out.fetch_add(v, Ordering::Relaxed);
                        }
                        None => thread::yield_now(),
                    }
                }
            })
        })
        .collect();

    for h in producers.into_iter().chain(consumers) {
        h.join().unwrap();
    }

    assert_eq!(produced.load(Ordering::SeqCst), PRODUCERS * PER_PRODUCER);
    assert_eq!(consumed.load(Ordering::SeqCst), produced.load(Ordering::SeqCst));
    assert_eq!(sum_out.load(Ordering::SeqCst), sum_in.load(Ordering::SeqCst));
    assert!(ring.is_empty());
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_spsc_preserves_order() {
    const COUNT: u64 = 200_000;
    let ring = MpmcRing::with_capacity(64);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..COUNT {
                push_blocking(&ring, i);
            }
        });

        s.spawn(|| {
            let mut expected = 0;
            while expected < COUNT {
                if let Some(v) = ring.dequeue() {
                    assert_eq!(v, expected, "out of order");
                    expected += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });
    });

    assert!(ring.is_empty());
}

#[test]
fn test_per_producer_order_with_single_consumer() {
    const PRODUCERS: u64 = 3;
    const PER_PRODUCER: u64 = 30_000;
    let ring = MpmcRing::with_capacity(128);

    thread::scope(|s| {
        for p in 0..PRODUCERS {
            let ring = &ring;
            s.spawn(move || {
                for i in 0..PER_PRODUCER {
                    push_blocking(ring, (p, i));
                }
            });
        }

        // Values from one producer must come out in that producer's order
        let mut last: HashMap<u64, u64> = HashMap::new();
        let mut received = 0;
        while received < PRODUCERS * PER_PRODUCER {
            match ring.dequeue() {
                Some((p, i)) => {
                    if let Some(prev) = last.insert(p, i) {
                        assert!(i > prev, "producer {} reordered: {} after {}", p, i, prev);
                    }
                    received += 1;
                }
                None => thread::yield_now(),
            }
        }
    });
}

// ============================================================================
// Capacity Bound
// ============================================================================

#[test]
fn test_capacity_bound_under_concurrent_producers() {
    const CAPACITY: usize = 64;
    let ring = MpmcRing::with_capacity(CAPACITY);
    let accepted = AtomicUsize::new(0);
    let rejected = AtomicUsize::new(0);

    // Nobody consumes: exactly CAPACITY pushes may succeed
    thread::scope(|s| {
        for t in 0..4u64 {
            let (ring, accepted, rejected) = (&ring, &accepted, &rejected);
            s.spawn(move || {
                for i in 0..100u64 {
                    match ring.enqueue(t * 100 + i) {
                        Ok(()) => accepted.fetch_add(1, Ordering::Relaxed),
                        Err(_) => rejected.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    assert_eq!(accepted.load(Ordering::SeqCst), CAPACITY);
    assert_eq!(rejected.load(Ordering::SeqCst), 400 - CAPACITY);
    assert!(ring.is_full());

    let mut drained = 0;
    while ring.dequeue().is_some() {
        drained += 1;
    }
    assert_eq!(drained, CAPACITY);
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn test_heap_values_cross_threads_intact() {
    let ring = MpmcRing::with_capacity(32);

    thread::scope(|s| {
        for p in 0..2 {
            let ring = &ring;
            s.spawn(move || {
                for i in 0..5_000 {
                    push_blocking(ring, format!("{}-{}", p, i));
                }
            });
        }

        let mut got = Vec::with_capacity(10_000);
        while got.len() < 10_000 {
            match ring.dequeue() {
                Some(v) => got.push(v),
                None => thread::yield_now(),
            }
        }

        got.sort();
        got.dedup();
        assert_eq!(got.len(), 10_000);
    });
}
