use bridge::{Frame, FrameBuffer, Generation};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn numbered(n: u64) -> Frame {
    Frame::from(n.to_le_bytes().to_vec())
}

fn number_of(frame: &Frame) -> u64 {
    u64::from_le_bytes(frame[..8].try_into().unwrap())
}

/// Two consumers blocked on an empty buffer are both woken by the first
/// publish and both receive that exact frame.
#[test]
fn test_blocked_consumers_all_receive_published_frame() {
    let buffer = Arc::new(FrameBuffer::new());
    let ready = Arc::new(Barrier::new(3));

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                ready.wait();
                buffer.await_next(0)
            })
        })
        .collect();

    ready.wait();
    // Give both consumers time to park on the condvar
    thread::sleep(Duration::from_millis(50));
    buffer.publish(Frame::from(&b"C"[..]));

    for consumer in consumers {
        let (frame, generation) = consumer.join().unwrap();
        assert_eq!(&frame[..], b"C", "Waiting consumer should get frame C");
        assert_eq!(generation, 1, "Frame C should be generation 1");
    }
}

/// A consumer that was already parked must wake for the publish and must not
/// stay blocked while a fresher frame exists.
#[test]
fn test_no_lost_wakeup_across_many_rounds() {
    let buffer = Arc::new(FrameBuffer::new());
    let rounds = 200u64;

    for round in 1..=rounds {
        let consumer = {
            let buffer = Arc::clone(&buffer);
            let last_seen = round - 1;
            thread::spawn(move || buffer.await_next_timeout(last_seen, Duration::from_secs(5)))
        };

        buffer.publish(numbered(round));

        let (frame, generation) = consumer
            .join()
            .unwrap()
            .expect("consumer must be woken by the publish");
        assert_eq!(generation, round);
        assert_eq!(number_of(&frame), round);
    }
}

/// Consumers racing a fast producer see strictly increasing generations and
/// the frame paired with each generation is the one published under it.
#[test]
fn test_generations_strictly_increase_under_load() {
    let buffer = Arc::new(FrameBuffer::new());
    let total = 2_000u64;

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut last: Generation = 0;
                let mut received = Vec::new();
                while last < total {
                    match buffer.await_next_timeout(last, Duration::from_secs(5)) {
                        Some((frame, generation)) => {
                            assert!(
                                generation > last,
                                "generation went backwards: {} after {}",
                                generation,
                                last
                            );
                            assert_eq!(number_of(&frame), generation);
                            received.push(generation);
                            last = generation;
                        }
                        None => panic!("producer stalled at generation {}", last),
                    }
                }
                received
            })
        })
        .collect();

    for n in 1..=total {
        buffer.publish(numbered(n));
        if n % 100 == 0 {
            thread::yield_now();
        }
    }

    for consumer in consumers {
        let received = consumer.join().unwrap();
        assert_eq!(*received.last().unwrap(), total);
        assert!(received.windows(2).all(|w| w[0] < w[1]));
    }
}

/// A consumer calling once per publish, in lock step, sees every generation
/// exactly once and in order.
#[test]
fn test_lock_step_consumer_sees_each_generation_once() {
    let buffer = FrameBuffer::new();
    let mut last = 0;

    for n in 1..=50 {
        buffer.publish(numbered(n));
        let (frame, generation) = buffer.await_next(last);
        assert_eq!(generation, n);
        assert_eq!(number_of(&frame), n);
        last = generation;
    }

    assert!(buffer.try_next(last).is_none());
}
