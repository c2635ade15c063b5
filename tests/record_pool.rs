mod common;

use messenger::{DEFAULT_POOL_CAPACITY, Error, Executable, Payload, RecordPool, TaskQueue, TaskRecord};
use std::sync::Arc;
use std::thread;

/// Takes a record out of a queue, so that it is still marked in use.
fn in_use_record(pool: &Arc<RecordPool>) -> TaskRecord {
    let queue = TaskQueue::new(pool.clone());
    queue.enqueue(pool.acquire(), 0).unwrap();
    queue.next().unwrap()
}

#[test]
fn test_acquire_from_empty_pool_allocates() {
    common::init_tracing();
    let pool = RecordPool::new();

    let record = pool.acquire();

    assert!(pool.is_empty());
    assert!(record.payload().is_none());
    assert!(record.executable().is_none());
    assert_eq!(record.when(), 0);
    assert!(!record.is_in_use());
}

#[test]
fn test_release_then_acquire_reuses_record() {
    common::init_tracing();
    let pool = RecordPool::new();

    pool.release(pool.acquire()).unwrap();
    pool.release(pool.acquire()).unwrap();
    assert_eq!(pool.len(), 1, "second acquire should have reused the first record");

    let _record = pool.acquire();
    assert!(pool.is_empty());
}

#[test]
fn test_release_clears_every_field() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());

    let record = in_use_record(&pool);
    assert!(record.is_in_use());

    let record = record
        .with_payload(Payload::new("data"))
        .with_executable(Executable::new(|| {}));
    pool.release_unchecked(record);

    let reused = pool.acquire();
    assert!(reused.payload().is_none());
    assert!(reused.executable().is_none());
    assert_eq!(reused.when(), 0);
    assert!(!reused.is_in_use());
}

#[test]
fn test_release_in_use_record_fails() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());
    let before = pool.len();

    let record = in_use_record(&pool);
    let result = pool.release(record);

    assert!(matches!(result, Err(Error::RecordInUse)));
    assert_eq!(pool.len(), before);
}

#[test]
fn test_pool_never_exceeds_capacity() {
    common::init_tracing();
    let pool = RecordPool::new();
    assert_eq!(pool.capacity(), DEFAULT_POOL_CAPACITY);

    let records: Vec<_> = (0..DEFAULT_POOL_CAPACITY + 25).map(|_| pool.acquire()).collect();
    for record in records {
        pool.release(record).unwrap();
        assert!(pool.len() <= DEFAULT_POOL_CAPACITY);
    }

    assert_eq!(pool.len(), DEFAULT_POOL_CAPACITY);
}

#[test]
fn test_zero_capacity_pool_never_keeps_records() {
    common::init_tracing();
    let pool = RecordPool::with_capacity(0);

    pool.release(pool.acquire()).unwrap();

    assert!(pool.is_empty());
}

#[test]
fn test_acquire_copy_copies_payload_and_executable_only() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());
    let payload = Payload::new(42_u32);
    let executable = Executable::new(|| {});

    let queue = TaskQueue::new(pool.clone());
    let original = pool
        .acquire()
        .with_payload(payload.clone())
        .with_executable(executable.clone());
    queue.enqueue(original, 1).unwrap();

    let source = queue.next().unwrap();
    assert!(source.is_in_use());
    assert_eq!(source.when(), 1);

    let copy = pool.acquire_copy(&source);

    assert!(copy.payload().unwrap().same(&payload));
    assert!(copy.executable().unwrap().same(&executable));
    assert_eq!(copy.when(), 0);
    assert!(!copy.is_in_use());
}

#[test]
fn test_acquire_copy_of_in_use_record_is_enqueueable() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());
    let payload = Payload::new("resend");

    let queue = TaskQueue::new(pool.clone());
    queue
        .enqueue(pool.acquire().with_payload(payload.clone()), 0)
        .unwrap();
    let dispatched = queue.next().unwrap();

    let copy = pool.acquire_copy(&dispatched);
    assert!(queue.enqueue(copy, 0).unwrap());
    assert!(queue.has_messages(Some(&payload)));

    pool.release_unchecked(dispatched);
}

#[test]
fn test_copy_from_takes_payload() {
    common::init_tracing();
    let payload = Payload::new(1_u8);
    let source = TaskRecord::obtain().with_payload(payload.clone());

    let mut target = TaskRecord::obtain().with_payload(Payload::new(2_u8));
    target.copy_from(&source);

    assert!(target.payload().unwrap().same(&payload));
    assert!(target.executable().is_none());
}

#[test]
fn test_payload_identity_is_not_value_equality() {
    let first = Payload::new(7_u32);
    let second = Payload::new(7_u32);

    assert!(first.same(&first.clone()));
    assert!(!first.same(&second));
    assert_eq!(first.downcast_ref::<u32>(), Some(&7));
}

#[test]
fn test_concurrent_acquire_and_release() {
    common::init_tracing();
    let pool = Arc::new(RecordPool::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let batch: Vec<_> = (0..10).map(|_| pool.acquire()).collect();
                    for record in batch {
                        pool.release(record).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(pool.len() <= DEFAULT_POOL_CAPACITY);
    assert!(!pool.is_empty());
}
