use crate::pacing::CapturePacing;
use crate::source::CaptureSource;
use crate::transform::FrameTransform;
use anyhow::{Context, Result};
use bridge::FrameBuffer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long [`ProducerHandle::close`] waits for the capture thread.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

const JOIN_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub published: u64,
    pub dropped: u64,
}

/// Capture loop feeding a [`FrameBuffer`].
///
/// Runs at the pacing cadence no matter how many consumers are attached and
/// never waits on them. A cycle that yields nothing, or fails, is counted as
/// dropped and the loop carries on.
pub struct FrameProducer {
    source: Box<dyn CaptureSource>,
    buffer: Arc<FrameBuffer>,
    transform: FrameTransform,
    pacing: CapturePacing,
}

impl FrameProducer {
    pub fn new(
        source: Box<dyn CaptureSource>,
        buffer: Arc<FrameBuffer>,
        transform: FrameTransform,
        pacing: CapturePacing,
    ) -> Self {
        Self {
            source,
            buffer,
            transform,
            pacing,
        }
    }

    /// Run until `shutdown` is set. The source is left open.
    pub fn run(&mut self, shutdown: &AtomicBool) -> ProducerStats {
        tracing::info!(
            backend = self.source.describe(),
            orientation = ?self.transform.orientation(),
            frame_budget = ?self.pacing.frame_duration(),
            "Starting frame producer"
        );

        let mut stats = ProducerStats::default();

        while !shutdown.load(Ordering::Acquire) {
            let started = Instant::now();

            if self.cycle(&mut stats) && stats.published.is_multiple_of(30) {
                tracing::debug!(
                    published = stats.published,
                    dropped = stats.dropped,
                    generation = self.buffer.generation(),
                    "Producer status"
                );
            }

            match self.pacing.remaining(started) {
                Some(left) => std::thread::sleep(left),
                None => tracing::trace!(
                    "Capture took longer than frame budget: {:?}",
                    started.elapsed()
                ),
            }
        }

        tracing::info!(
            published = stats.published,
            dropped = stats.dropped,
            "Frame producer stopped"
        );
        stats
    }

    /// One capture/transform/publish step. Returns whether a frame was
    /// published.
    fn cycle(&mut self, stats: &mut ProducerStats) -> bool {
        let frame = match self.source.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                stats.dropped += 1;
                tracing::debug!("Capture returned no data");
                return false;
            }
            Err(e) => {
                stats.dropped += 1;
                tracing::warn!(error = %e, "Frame capture failed");
                return false;
            }
        };

        let frame = match self.transform.apply(frame) {
            Ok(frame) => frame,
            Err(e) => {
                stats.dropped += 1;
                tracing::warn!(error = %e, "Frame transform failed");
                return false;
            }
        };

        self.buffer.publish(frame);
        stats.published += 1;
        true
    }

    /// Move the producer onto its own thread.
    ///
    /// The thread releases the capture source only after the loop has made
    /// its last publish.
    pub fn spawn(mut self) -> Result<ProducerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let thread = std::thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || {
                let stats = self.run(&flag);
                self.source.close();
                tracing::info!(backend = self.source.describe(), "Capture source released");
                stats
            })
            .context("Failed to spawn frame producer thread")?;

        Ok(ProducerHandle {
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Owner's side of a running producer thread.
pub struct ProducerHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<ProducerStats>>,
}

impl ProducerHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop capturing, wait for the thread, and return its counters.
    /// Not restartable.
    pub fn close(self) -> ProducerStats {
        self.close_within(CLOSE_TIMEOUT)
    }

    /// Like [`close`](Self::close) with an explicit wait bound. A thread
    /// still stuck in a capture after `timeout` is detached; it releases the
    /// source whenever that capture returns.
    pub fn close_within(mut self, timeout: Duration) -> ProducerStats {
        self.stop(timeout)
    }

    fn stop(&mut self, timeout: Duration) -> ProducerStats {
        self.shutdown.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return ProducerStats::default();
        };

        let deadline = Instant::now() + timeout;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                tracing::error!(
                    ?timeout,
                    "Frame producer stuck in capture - detaching thread"
                );
                return ProducerStats::default();
            }
            std::thread::sleep(JOIN_POLL);
        }

        match thread.join() {
            Ok(stats) => stats,
            Err(_) => {
                tracing::error!("Frame producer thread panicked");
                ProducerStats::default()
            }
        }
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop(CLOSE_TIMEOUT);
        }
    }
}
