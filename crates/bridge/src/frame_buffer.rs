use crate::frame::Frame;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[cfg(feature = "tokio")]
use std::sync::Arc;

/// Freshness counter of the frame held by a [`FrameBuffer`].
///
/// Zero means nothing has been published yet; the first publish yields 1.
pub type Generation = u64;

struct Slot {
    latest: Option<Frame>,
    generation: Generation,
    published_at: Option<Instant>,
}

impl Slot {
    fn newer_than(&self, last_seen: Generation) -> Option<(Frame, Generation)> {
        if self.generation <= last_seen {
            return None;
        }
        self.latest.clone().map(|frame| (frame, self.generation))
    }
}

/// Single-slot mailbox holding the most recent frame.
///
/// One producer calls [`publish`](Self::publish); any number of consumers
/// loop on [`await_next`](Self::await_next), passing back the generation they
/// received last. A frame nobody read before the next publish is dropped.
///
/// There is no close signal: a consumer stops by no longer waiting. A
/// consumer waiting without a timeout stays blocked until the next publish,
/// so long-lived callers should prefer the `_timeout` variant.
pub struct FrameBuffer {
    slot: Mutex<Slot>,
    fresh: Condvar,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                latest: None,
                generation: 0,
                published_at: None,
            }),
            fresh: Condvar::new(),
        }
    }

    // The slot is only ever written with whole-field assignments, so a
    // poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held frame and wake every waiting consumer.
    pub fn publish(&self, frame: Frame) -> Generation {
        let generation = {
            let mut slot = self.lock();
            slot.latest = Some(frame);
            slot.generation += 1;
            slot.published_at = Some(Instant::now());
            slot.generation
        };
        self.fresh.notify_all();
        generation
    }

    /// Block until a frame newer than `last_seen` is held and return it with
    /// its generation.
    pub fn await_next(&self, last_seen: Generation) -> (Frame, Generation) {
        let mut slot = self.lock();
        loop {
            if let Some(next) = slot.newer_than(last_seen) {
                return next;
            }
            slot = self
                .fresh
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`await_next`](Self::await_next), but gives up after `timeout`.
    pub fn await_next_timeout(
        &self,
        last_seen: Generation,
        timeout: Duration,
    ) -> Option<(Frame, Generation)> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            if let Some(next) = slot.newer_than(last_seen) {
                return Some(next);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = self
                .fresh
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking check for a frame newer than `last_seen`.
    pub fn try_next(&self, last_seen: Generation) -> Option<(Frame, Generation)> {
        self.lock().newer_than(last_seen)
    }

    /// The held frame, if any, regardless of who has seen it.
    pub fn latest(&self) -> Option<(Frame, Generation)> {
        self.try_next(0)
    }

    pub fn generation(&self) -> Generation {
        self.lock().generation
    }

    /// Time since the last publish, `None` before the first frame.
    pub fn last_publish_age(&self) -> Option<Duration> {
        self.lock().published_at.map(|at| at.elapsed())
    }

    /// Async wait for tokio callers. The blocking wait runs on the blocking
    /// pool so runtime workers are never parked on the condvar.
    #[cfg(feature = "tokio")]
    pub async fn await_next_async(
        self: &Arc<Self>,
        last_seen: Generation,
        timeout: Duration,
    ) -> Option<(Frame, Generation)> {
        if let Some(next) = self.try_next(last_seen) {
            return Some(next);
        }

        let buffer = Arc::clone(self);
        match tokio::task::spawn_blocking(move || buffer.await_next_timeout(last_seen, timeout))
            .await
        {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(error = %e, "Frame wait task failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn frame(tag: &'static [u8]) -> Frame {
        Frame::from(tag)
    }

    #[test]
    fn starts_empty() {
        let buffer = FrameBuffer::new();

        assert_eq!(buffer.generation(), 0);
        assert!(buffer.latest().is_none());
        assert!(buffer.last_publish_age().is_none());
        assert!(buffer.try_next(0).is_none());
    }

    #[test]
    fn publish_bumps_generation() {
        let buffer = FrameBuffer::new();

        assert_eq!(buffer.publish(frame(b"a")), 1);
        assert_eq!(buffer.publish(frame(b"b")), 2);
        assert_eq!(buffer.generation(), 2);
        assert!(buffer.last_publish_age().is_some());
    }

    #[test]
    fn published_frame_is_returned_to_new_consumer() {
        let buffer = FrameBuffer::new();
        buffer.publish(frame(b"A"));

        let (got, generation) = buffer.await_next(0);
        assert_eq!(&got[..], b"A");
        assert_eq!(generation, 1);
    }

    #[test]
    fn late_consumer_only_sees_newest_frame() {
        let buffer = FrameBuffer::new();
        buffer.publish(frame(b"A"));
        buffer.publish(frame(b"B"));

        let (got, generation) = buffer.await_next(0);
        assert_eq!(&got[..], b"B");
        assert_eq!(generation, 2);
    }

    #[test]
    fn consumed_generation_is_not_returned_again() {
        let buffer = FrameBuffer::new();
        buffer.publish(frame(b"A"));
        let (_, seen) = buffer.await_next(0);

        assert!(buffer.try_next(seen).is_none());
        assert!(
            buffer
                .await_next_timeout(seen, Duration::from_millis(20))
                .is_none()
        );
    }

    #[test]
    fn timeout_wait_returns_once_frame_arrives() {
        let buffer = Arc::new(FrameBuffer::new());
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                buffer.publish(frame(b"late"));
            })
        };

        let next = buffer.await_next_timeout(0, Duration::from_secs(5));
        producer.join().unwrap();

        let (got, generation) = next.expect("frame should arrive before the timeout");
        assert_eq!(&got[..], b"late");
        assert_eq!(generation, 1);
    }

    #[test]
    fn reader_copy_outlives_overwrite() {
        let buffer = FrameBuffer::new();
        buffer.publish(frame(b"old"));
        let (held, _) = buffer.await_next(0);

        buffer.publish(frame(b"new"));

        assert_eq!(&held[..], b"old");
        assert_eq!(&buffer.latest().unwrap().0[..], b"new");
    }
}
