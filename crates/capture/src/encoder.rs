use anyhow::{Context, Result};
use turbojpeg::{Compressor, Image, PixelFormat, Subsamp};

/// Software JPEG encoder backed by libjpeg-turbo.
pub struct JpegEncoder {
    compressor: Compressor,
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Result<Self> {
        let quality = quality.clamp(1, 100);
        let mut compressor = Compressor::new().context("Failed to create JPEG compressor")?;
        compressor.set_quality(quality as i32)?;
        compressor.set_subsamp(Subsamp::Sub2x2)?;
        Ok(Self {
            compressor,
            quality,
        })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode tightly packed RGB pixels.
    pub fn encode_rgb(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let (width, height) = (width as usize, height as usize);
        anyhow::ensure!(
            rgb.len() >= width * height * 3,
            "RGB buffer too small: {} bytes for {}x{}",
            rgb.len(),
            width,
            height
        );

        let image = Image {
            pixels: rgb,
            width,
            pitch: width * 3,
            height,
            format: PixelFormat::RGB,
        };

        self.compressor
            .compress_to_vec(image)
            .context("JPEG compression failed")
    }
}
