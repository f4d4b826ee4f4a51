use crate::config::CaptureConfig;
use crate::decoder::YuyvDecoder;
use crate::device::{CameraDevice, PixelFormat};
use crate::encoder::JpegEncoder;
use anyhow::{Context, Result, bail};
use bridge::Frame;
use std::io;
use std::time::Duration;
use turbojpeg::Decompressor;
use v4l::{
    Device,
    buffer::Type,
    io::{mmap::Stream as MmapStream, traits::CaptureStream},
};

const BUFFER_COUNT: u32 = 4;

/// Frame intervals a dequeue may wait before the cycle is given up.
const STALL_FRAMES: f64 = 4.0;
const MIN_DEQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

/// Upper bound on one blocking dequeue at the camera's frame rate.
pub(crate) fn dequeue_timeout(fps: f64) -> Duration {
    let interval = if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(STALL_FRAMES / fps)
    } else {
        MIN_DEQUEUE_TIMEOUT
    };
    interval.max(MIN_DEQUEUE_TIMEOUT)
}

/// A dequeue that timed out is an empty cycle, anything else is an error.
pub(crate) fn stalled_as_empty<T>(dequeued: io::Result<T>) -> Result<Option<T>> {
    match dequeued {
        Ok(next) => Ok(Some(next)),
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
        Err(e) => Err(e).context("Failed to dequeue capture buffer"),
    }
}

/// Something that yields JPEG frames on demand.
///
/// Every implementation hands out frames at the configured resolution and
/// quality, so the producer does not care which one it drives.
pub trait CaptureSource: Send {
    /// Grab one frame. `Ok(None)` means the cycle produced no data.
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// Stop streaming and release the device. Later captures fail.
    fn close(&mut self);

    fn describe(&self) -> &'static str;
}

/// Open the configured camera and wrap it in the matching source.
///
/// Failure here is fatal: the process cannot serve video without a camera.
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn CaptureSource>> {
    let camera = CameraDevice::open(config)
        .context("Failed to initialize camera - check V4L2 device availability")?;

    let source: Box<dyn CaptureSource> = match camera.pixel_format {
        PixelFormat::Mjpeg => Box::new(HardwareJpegSource::new(camera)?),
        PixelFormat::Yuyv => Box::new(SoftwareJpegSource::new(camera, config.jpeg_quality)?),
    };

    tracing::info!(backend = source.describe(), "Capture source ready");
    Ok(source)
}

struct V4lStream {
    stream: Option<MmapStream<'static>>,
    timeout: Duration,
    _device: Device,
}

impl V4lStream {
    fn start(device: Device, fps: f64) -> Result<Self> {
        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .context("Failed to create capture stream")?;
        // Without a timeout a wedged camera blocks the dequeue forever
        let timeout = dequeue_timeout(fps);
        stream.set_timeout(timeout);

        Ok(Self {
            stream: Some(stream),
            timeout,
            _device: device,
        })
    }

    /// Dequeue the next buffer, trimmed to the bytes the driver filled.
    fn next_payload(&mut self) -> Result<Option<&[u8]>> {
        let Some(stream) = self.stream.as_mut() else {
            bail!("Capture stream is closed");
        };

        let Some((buf, meta)) = stalled_as_empty(stream.next())? else {
            tracing::debug!(timeout = ?self.timeout, "No buffer from camera within timeout");
            return Ok(None);
        };
        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            return Ok(None);
        }
        Ok(Some(&buf[..used]))
    }

    fn stop(&mut self) {
        // Dropping the stream turns streaming off and unmaps the buffers
        self.stream.take();
    }
}

/// Variant A: the camera encodes JPEG itself, frames are passed through.
pub struct HardwareJpegSource {
    stream: V4lStream,
    decompressor: Decompressor,
    width: u32,
    height: u32,
}

impl HardwareJpegSource {
    pub fn new(camera: CameraDevice) -> Result<Self> {
        Ok(Self {
            width: camera.width,
            height: camera.height,
            stream: V4lStream::start(camera.device, camera.fps)?,
            decompressor: Decompressor::new().context("Failed to create JPEG decompressor")?,
        })
    }
}

impl CaptureSource for HardwareJpegSource {
    fn capture(&mut self) -> Result<Option<Frame>> {
        let Some(jpeg) = self.stream.next_payload()? else {
            return Ok(None);
        };

        // Cheap header parse catches truncated buffers before they reach clients
        let header = self
            .decompressor
            .read_header(jpeg)
            .context("Camera produced an unreadable JPEG")?;
        if (header.width, header.height) != (self.width as usize, self.height as usize) {
            bail!(
                "Camera JPEG is {}x{}, expected {}x{}",
                header.width,
                header.height,
                self.width,
                self.height
            );
        }

        Ok(Some(Frame::from(jpeg.to_vec())))
    }

    fn close(&mut self) {
        self.stream.stop();
    }

    fn describe(&self) -> &'static str {
        "hardware-jpeg"
    }
}

/// Variant B: raw YUYV capture encoded in software.
pub struct SoftwareJpegSource {
    stream: V4lStream,
    decoder: YuyvDecoder,
    encoder: JpegEncoder,
    width: u32,
    height: u32,
}

impl SoftwareJpegSource {
    pub fn new(camera: CameraDevice, quality: u8) -> Result<Self> {
        Ok(Self {
            width: camera.width,
            height: camera.height,
            stream: V4lStream::start(camera.device, camera.fps)?,
            decoder: YuyvDecoder::new(),
            encoder: JpegEncoder::new(quality)?,
        })
    }
}

impl CaptureSource for SoftwareJpegSource {
    #[tracing::instrument(level = "trace", skip(self))]
    fn capture(&mut self) -> Result<Option<Frame>> {
        let Some(raw) = self.stream.next_payload()? else {
            return Ok(None);
        };

        let rgb = self.decoder.decode(raw, self.width, self.height)?;
        let jpeg = self.encoder.encode_rgb(rgb, self.width, self.height)?;
        Ok(Some(Frame::from(jpeg)))
    }

    fn close(&mut self) {
        self.stream.stop();
    }

    fn describe(&self) -> &'static str {
        "software-jpeg"
    }
}
