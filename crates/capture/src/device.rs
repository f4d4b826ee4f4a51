use crate::config::{CaptureBackend, CaptureConfig};
use anyhow::{Context, Result, anyhow, bail};
use common::retry_with_backoff;
use std::time::Duration;
use v4l::{
    Device, FourCC,
    control::{Control, Value},
    video::{Capture, capture::Parameters},
};

const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

// V4L2 control ID (from videodev2.h)
const V4L2_CID_JPEG_COMPRESSION_QUALITY: u32 = 0x009d0903;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Camera-encoded JPEG
    Mjpeg,
    /// Raw YUV 4:2:2
    Yuyv,
}

impl PixelFormat {
    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Mjpeg => FOURCC_MJPG,
            PixelFormat::Yuyv => FOURCC_YUYV,
        }
    }
}

fn find_usable_camera() -> Option<usize> {
    v4l::context::enum_devices()
        .into_iter()
        .find(|dev| {
            Device::with_path(dev.path())
                .and_then(|d| d.query_caps())
                .map(|caps| {
                    caps.capabilities
                        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                })
                .unwrap_or(false)
        })
        .map(|dev| dev.index())
}

fn open_device(index: u32) -> Result<Device> {
    if let Ok(dev) = Device::new(index as usize)
        && dev.query_caps().is_ok()
    {
        return Ok(dev);
    }

    tracing::debug!(
        "Camera index {} busy or missing, scanning alternatives...",
        index
    );

    let fallback = find_usable_camera().ok_or_else(|| anyhow!("No usable video devices found"))?;
    Device::new(fallback).context("Failed to open fallback camera device")
}

/// Map the configured backend onto a pixel format the device offers.
///
/// `hardware_quality` says whether the camera's encoder can be held at the
/// configured JPEG quality. `Auto` only takes the hardware path when it can,
/// unless the camera offers nothing else.
pub(crate) fn choose_format(
    backend: CaptureBackend,
    offered: &[FourCC],
    hardware_quality: bool,
) -> Result<PixelFormat> {
    let has = |format: PixelFormat| offered.contains(&format.fourcc());

    match backend {
        CaptureBackend::Hardware if has(PixelFormat::Mjpeg) => Ok(PixelFormat::Mjpeg),
        CaptureBackend::Software if has(PixelFormat::Yuyv) => Ok(PixelFormat::Yuyv),
        CaptureBackend::Auto if has(PixelFormat::Mjpeg) && hardware_quality => {
            Ok(PixelFormat::Mjpeg)
        }
        CaptureBackend::Auto if has(PixelFormat::Yuyv) => Ok(PixelFormat::Yuyv),
        CaptureBackend::Auto if has(PixelFormat::Mjpeg) => Ok(PixelFormat::Mjpeg),
        _ => Err(anyhow!(
            "Camera cannot serve the {:?} backend - available: {:?}",
            backend,
            offered
        )),
    }
}

/// Range of the camera's JPEG quality control, `None` when not exposed.
fn jpeg_quality_range(device: &Device) -> Option<(i64, i64)> {
    match device.query_controls() {
        Ok(controls) => controls
            .iter()
            .find(|c| c.id == V4L2_CID_JPEG_COMPRESSION_QUALITY)
            .map(|c| (c.minimum, c.maximum)),
        Err(e) => {
            tracing::warn!("Failed to query camera controls: {}", e);
            None
        }
    }
}

pub(crate) fn quality_in_range(range: Option<(i64, i64)>, quality: u8) -> bool {
    range.is_some_and(|(min, max)| (min..=max).contains(&(quality as i64)))
}

/// Ask the camera's encoder for the configured JPEG quality.
fn configure_jpeg_quality(device: &Device, range: Option<(i64, i64)>, quality: u8) {
    if !quality_in_range(range, quality) {
        tracing::warn!(
            quality,
            control = ?range,
            "Camera cannot hold the configured JPEG quality - frames use the firmware setting"
        );
        return;
    }

    match device.set_control(Control {
        id: V4L2_CID_JPEG_COMPRESSION_QUALITY,
        value: Value::Integer(quality as i64),
    }) {
        Ok(()) => tracing::info!("Hardware JPEG quality: {}", quality),
        Err(e) => tracing::warn!("Failed to set hardware JPEG quality: {}", e),
    }
}

/// An opened V4L2 device negotiated to the configured size and rate.
pub struct CameraDevice {
    pub device: Device,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub fps: f64,
}

impl CameraDevice {
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let device = retry_with_backoff(
            || open_device(config.device_id),
            10,
            Duration::from_millis(200),
            "Camera init",
        )?;

        let caps = device.query_caps()?;
        tracing::info!("Camera opened: {} ({})", caps.card, caps.driver);

        let offered: Vec<FourCC> = device.enum_formats()?.into_iter().map(|f| f.fourcc).collect();
        tracing::debug!("Available formats: {:?}", offered);

        let quality_range = jpeg_quality_range(&device);
        let hardware_quality = quality_in_range(quality_range, config.jpeg_quality);
        let pixel_format = choose_format(config.backend, &offered, hardware_quality)?;

        let mut format = device.format()?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = pixel_format.fourcc();
        let format = device.set_format(&format)?;

        if format.fourcc != pixel_format.fourcc() {
            bail!(
                "Camera refused {:?}, negotiated {:?} instead",
                pixel_format,
                format.fourcc
            );
        }
        if (format.width, format.height) != (config.width, config.height) {
            bail!(
                "Camera cannot capture at {}x{} (negotiated {}x{})",
                config.width,
                config.height,
                format.width,
                format.height
            );
        }

        tracing::info!(
            "Capture format: {}x{} {:?} ({:?})",
            format.width,
            format.height,
            format.fourcc,
            pixel_format
        );

        let requested_fps = config.fps.round().max(1.0) as u32;
        let params = match device.set_params(&Parameters::with_fps(requested_fps)) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("Camera refused {} fps: {}", requested_fps, e);
                device.params()?
            }
        };
        let fps = params.interval.denominator as f64 / params.interval.numerator.max(1) as f64;
        tracing::info!("Frame rate: {:.1} fps", fps);

        if pixel_format == PixelFormat::Mjpeg {
            configure_jpeg_quality(&device, quality_range, config.jpeg_quality);
        }

        Ok(Self {
            device,
            width: format.width,
            height: format.height,
            pixel_format,
            fps,
        })
    }
}
