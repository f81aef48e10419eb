//! Stress tests for the ring buffer
//!
//! Many producers write concurrently while a single reader drains. The
//! reader checks that frames never overlap (every payload is intact), that
//! each producer's frames arrive in the order they were committed, and that
//! nothing is lost when producers retry on backpressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use evlog_transport::RingBuffer;

/// Payload: producer id, sequence number, then a fill byte repeated
fn encode(producer: u32, sequence: u32, buf: &mut [u8]) {
    buf[..4].copy_from_slice(&producer.to_le_bytes());
    buf[4..8].copy_from_slice(&sequence.to_le_bytes());
    let fill = (producer as u8) ^ (sequence as u8);
    for b in &mut buf[8..] {
        *b = fill;
    }
}

fn decode(buf: &[u8]) -> (u32, u32) {
    let producer = u32::from_le_bytes(buf[..4].try_into().unwrap());
    let sequence = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    let fill = (producer as u8) ^ (sequence as u8);
    assert!(
        buf[8..].iter().all(|b| *b == fill),
        "corrupted payload from producer {producer} seq {sequence}"
    );
    (producer, sequence)
}

/// Producers retry until every frame is written; nothing may be lost
#[test]
fn test_concurrent_producers_lossless() {
    const PRODUCERS: u32 = 8;
    const PER_PRODUCER: u32 = 20_000;

    let ring = Arc::new(RingBuffer::new(64 * 1024, 256).unwrap());
    let barrier = Arc::new(Barrier::new(PRODUCERS as usize + 1));
    let mut handles = vec![];

    let start = Instant::now();

    for producer in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for sequence in 0..PER_PRODUCER {
                // Vary the length so frames straddle the wrap point
                let length = 8 + (sequence as usize * 7 + producer as usize) % 120;
                loop {
                    if let Some(mut handle) = ring.try_claim(producer as i32 + 1, length).unwrap() {
                        encode(producer, sequence, handle.buffer_mut());
                        handle.commit();
                        break;
                    }
                    thread::yield_now();
                }
            }
        }));
    }

    barrier.wait();
    let mut next = vec![0u32; PRODUCERS as usize];
    let total = (PRODUCERS * PER_PRODUCER) as usize;
    let mut received = 0;
    while received < total {
        let read = ring.read(
            |type_id, payload| {
                let (producer, sequence) = decode(payload);
                assert_eq!(type_id, producer as i32 + 1);
                assert_eq!(next[producer as usize], sequence, "out of order");
                next[producer as usize] += 1;
            },
            64,
        );
        if read == 0 {
            thread::yield_now();
        }
        received += read;
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(next.iter().all(|n| *n == PER_PRODUCER));
    assert!(ring.is_empty());
    println!("{} frames in {:?}", total, start.elapsed());
}

/// Producers never retry: drops are allowed but committed frames stay intact
/// and the claimed size never exceeds capacity
#[test]
fn test_flood_respects_capacity() {
    const PRODUCERS: u32 = 4;
    const ATTEMPTS: u32 = 50_000;

    let ring = Arc::new(RingBuffer::new(4096, 64).unwrap());
    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for producer in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            let mut written = 0u32;
            for sequence in 0..ATTEMPTS {
                let mut buf = [0u8; 24];
                encode(producer, sequence, &mut buf);
                if ring.write(1, &buf).unwrap() {
                    written += 1;
                }
                assert!(ring.size() <= ring.capacity());
            }
            written
        }));
    }

    let reader = {
        let ring = Arc::clone(&ring);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut last = vec![None::<u32>; PRODUCERS as usize];
            let mut count = 0u32;
            let mut drain = |ring: &RingBuffer| {
                ring.read(
                    |_, payload| {
                        let (producer, sequence) = decode(payload);
                        if let Some(prev) = last[producer as usize] {
                            assert!(sequence > prev, "out of order");
                        }
                        last[producer as usize] = Some(sequence);
                        count += 1;
                    },
                    16,
                )
            };
            while !stop.load(Ordering::Acquire) {
                drain(&ring);
            }
            while drain(&ring) > 0 {}
            count
        })
    };

    let written: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    stop.store(true, Ordering::Release);
    let read = reader.join().unwrap();

    assert_eq!(written, read);
    assert!(ring.is_empty());
}

/// Claims that are dropped or aborted under contention never reach the reader
#[test]
fn test_concurrent_aborts_skipped() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 5_000;

    let ring = Arc::new(RingBuffer::new(16 * 1024, 64).unwrap());
    let mut handles = vec![];

    for producer in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            let mut committed = 0u32;
            for sequence in 0..PER_PRODUCER {
                let mut handle = loop {
                    if let Some(handle) = ring.try_claim(2, 16).unwrap() {
                        break handle;
                    }
                    thread::yield_now();
                };
                encode(producer, sequence, handle.buffer_mut());
                if sequence % 3 == 0 {
                    handle.abort();
                } else {
                    handle.commit();
                    committed += 1;
                }
            }
            committed
        }));
    }

    let mut received = 0u32;
    let expected: u32 = {
        let mut done = 0;
        while done < PRODUCERS as usize {
            received += ring.read(
                |type_id, payload| {
                    assert_eq!(type_id, 2);
                    let (_, sequence) = decode(payload);
                    assert_ne!(sequence % 3, 0, "aborted frame delivered");
                },
                32,
            ) as u32;
            done = handles.iter().filter(|h| h.is_finished()).count();
        }
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    };
    while received < expected {
        received += ring.read(|_, _| {}, 32) as u32;
    }

    assert_eq!(received, expected);
    assert!(ring.is_empty());
}

/// Producers racing a reader that drains everything it can on each pass
///
/// The reader regularly overtakes the tail a producer loaded, so claims must
/// cope with a consumer position newer than their producer snapshot.
#[test]
fn test_producers_race_greedy_reader() {
    const PRODUCERS: u32 = 16;
    const ATTEMPTS: u32 = 200_000;

    let ring = Arc::new(RingBuffer::new(1024, 8).unwrap());
    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(PRODUCERS as usize + 1));
    let mut handles = vec![];

    for producer in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut written = 0u64;
            for sequence in 0..ATTEMPTS {
                let mut buf = [0u8; 8];
                encode(producer, sequence, &mut buf);
                if ring.write(1, &buf).unwrap() {
                    written += 1;
                }
            }
            written
        }));
    }

    let reader = {
        let ring = Arc::clone(&ring);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut count = 0u64;
            let mut drain = |ring: &RingBuffer| {
                ring.read(
                    |_, payload| {
                        decode(payload);
                        count += 1;
                    },
                    usize::MAX,
                )
            };
            while !stop.load(Ordering::Acquire) {
                drain(&ring);
            }
            while drain(&ring) > 0 {}
            count
        })
    };

    barrier.wait();
    let written: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    stop.store(true, Ordering::Release);
    let read = reader.join().unwrap();

    assert!(written > 0);
    assert_eq!(written, read);
    assert!(ring.is_empty());
}
