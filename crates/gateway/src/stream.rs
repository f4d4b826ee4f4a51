//! MJPEG framing of the frame buffer for `multipart/x-mixed-replace` clients.

use async_stream::stream;
use bridge::{Frame, FrameBuffer, Generation};
use bytes::{BufMut, Bytes, BytesMut};
use futures_core::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const BOUNDARY: &str = "frame";
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Wrap one JPEG as a multipart part, trailing CRLF included.
pub fn multipart_part(frame: &Frame) -> Bytes {
    let mut part = BytesMut::with_capacity(PART_HEADER.len() + frame.len() + 2);
    part.put_slice(PART_HEADER);
    part.put_slice(frame.as_bytes());
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Logs the viewer's lifetime; dropped when the response body is.
struct Viewer {
    sent: u64,
    last_seen: Generation,
}

impl Viewer {
    fn connect() -> Self {
        tracing::info!("Video client connected");
        Self {
            sent: 0,
            last_seen: 0,
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        tracing::info!(
            frames_sent = self.sent,
            last_generation = self.last_seen,
            "Video client disconnected"
        );
    }
}

/// Endless sequence of multipart parts, one per fresh frame.
///
/// Starts from generation 0, so a frame already published is sent right
/// away. Ends when no frame arrives within `idle_timeout` or when `shutdown`
/// turns true.
pub fn frame_stream(
    frames: Arc<FrameBuffer>,
    idle_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream! {
        let mut viewer = Viewer::connect();

        loop {
            let next = tokio::select! {
                next = frames.await_next_async(viewer.last_seen, idle_timeout) => next,
                _ = shutdown.wait_for(|stop| *stop) => {
                    tracing::debug!("Closing video stream for shutdown");
                    break;
                }
            };

            let Some((frame, generation)) = next else {
                tracing::warn!(timeout = ?idle_timeout, "No frame within idle timeout - closing video stream");
                break;
            };

            if generation > viewer.last_seen + 1 && viewer.last_seen != 0 {
                tracing::trace!(skipped = generation - viewer.last_seen - 1, "Slow client skipped frames");
            }
            viewer.last_seen = generation;
            viewer.sent += 1;

            yield Ok(multipart_part(&frame));
        }
    }
}
