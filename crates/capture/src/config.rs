use common::{env_flag, env_or};
use std::str::FromStr;

/// Largest JPEG MCU edge across the chroma layouts cameras emit (4:2:0).
/// Lossless rotation only keeps the full frame when both sides are multiples
/// of it.
pub const MCU_SIZE: u32 = 16;

/// Which capture path produces the JPEG frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBackend {
    /// Prefer hardware, fall back to software.
    Auto,
    /// Camera-side JPEG encoder (V4L2 `MJPG`).
    Hardware,
    /// Raw `YUYV` capture plus libjpeg-turbo encoding.
    Software,
}

impl FromStr for CaptureBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "hardware" | "hw" | "mjpeg" => Ok(Self::Hardware),
            "software" | "sw" | "yuyv" => Ok(Self::Software),
            other => Err(format!(
                "{} is not a capture backend. Use `auto`, `hardware` or `software`.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub device_id: u32,
    pub backend: CaptureBackend,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub jpeg_quality: u8,
    pub rotate_180: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            backend: CaptureBackend::Auto,
            width: 640,
            height: 480,
            fps: 30.0,
            jpeg_quality: 70,
            rotate_180: false,
        }
    }
}

impl CaptureConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("CAPTURE_BACKEND") {
            Ok(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.backend,
        };

        let fps: f64 = env_or("CAPTURE_FPS", defaults.fps);
        if !(fps.is_finite() && fps > 0.0) {
            anyhow::bail!("CAPTURE_FPS must be a positive number, got {}", fps);
        }

        let config = Self {
            device_id: env_or("CAMERA_DEVICE_ID", defaults.device_id),
            backend,
            width: env_or("CAPTURE_WIDTH", defaults.width),
            height: env_or("CAPTURE_HEIGHT", defaults.height),
            fps,
            jpeg_quality: env_or("CAPTURE_JPEG_QUALITY", defaults.jpeg_quality).clamp(1, 100),
            rotate_180: env_flag("CAPTURE_ROTATE_180", defaults.rotate_180),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject sizes the capture pipeline cannot publish unchanged.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("Capture size {}x{} is empty", self.width, self.height);
        }
        if self.rotate_180
            && !(self.width.is_multiple_of(MCU_SIZE) && self.height.is_multiple_of(MCU_SIZE))
        {
            anyhow::bail!(
                "CAPTURE_ROTATE_180 needs a size that is a multiple of {} pixels, got {}x{}",
                MCU_SIZE,
                self.width,
                self.height
            );
        }
        Ok(())
    }
}
