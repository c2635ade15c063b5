mod common;

use messenger::time::now_millis;
use messenger::{Payload, RecordPool, TaskQueue};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const PRODUCERS: usize = 4;
const PER_PRODUCER: usize = 100;

#[test]
fn test_concurrent_producers_yield_globally_sorted_sequence() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());
    let queue = Arc::new(TaskQueue::new(pool.clone()));
    let barrier = Arc::new(Barrier::new(PRODUCERS + 1));

    // Leaves the producers time to enqueue everything before the first
    // deadline comes due.
    let base = now_millis() + 300;

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut seen = Vec::with_capacity(PRODUCERS * PER_PRODUCER);
            while let Some(record) = queue.next() {
                seen.push(record.when());
                queue.pool().release_unchecked(record);
            }
            seen
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in (0..PER_PRODUCER).rev() {
                    let when = base + (i * PRODUCERS + producer) as u64;
                    let record = queue.pool().acquire();
                    assert!(queue.enqueue(record, when).unwrap());
                }
            })
        })
        .collect();

    barrier.wait();
    for producer in producers {
        producer.join().unwrap();
    }

    let last = base + (PRODUCERS * PER_PRODUCER) as u64;
    while now_millis() <= last {
        thread::sleep(Duration::from_millis(10));
    }
    queue.stop(true);

    let seen = consumer.join().unwrap();
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(pool.len() <= pool.capacity());
}

#[test]
fn test_concurrent_producers_keep_per_producer_fifo_and_lose_nothing() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());
    let queue = Arc::new(TaskQueue::new(pool.clone()));
    let total = PRODUCERS * PER_PRODUCER * 5;

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut seen = Vec::with_capacity(total);
            while let Some(record) = queue.next() {
                let tag = *record
                    .payload()
                    .and_then(|p| p.downcast_ref::<(usize, usize)>())
                    .unwrap();
                seen.push(tag);
                queue.pool().release_unchecked(record);
            }
            seen
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER * 5 {
                    let record = queue
                        .pool()
                        .acquire()
                        .with_payload(Payload::new((producer, i)));
                    assert!(queue.enqueue(record, 1).unwrap());
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    queue.stop(true);

    let seen = consumer.join().unwrap();
    assert_eq!(seen.len(), total);

    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), total, "no record may be delivered twice");

    for producer in 0..PRODUCERS {
        let order: Vec<usize> = seen
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, i)| *i)
            .collect();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn test_stop_racing_with_producers_never_leaks_in_use_records() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::with_capacity(10_000));
    let queue = Arc::new(TaskQueue::new(pool.clone()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut accepted = 0;
                for _ in 0..PER_PRODUCER {
                    let record = queue.pool().acquire();
                    if queue.enqueue(record, now_millis() + 60_000).unwrap() {
                        accepted += 1;
                    }
                }
                accepted
            })
        })
        .collect();

    queue.stop(false);

    let accepted: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();
    assert!(accepted <= PRODUCERS * PER_PRODUCER);
    assert!(queue.is_empty(), "a stopped queue keeps nothing");
    assert!(queue.next().is_none());

    for _ in 0..pool.len() {
        assert!(!pool.acquire().is_in_use());
    }
}
