use anyhow::{Result, bail};

/// YUYV (YUV 4:2:2) to packed RGB converter.
///
/// YUYV packs 2 pixels in 4 bytes: [Y0, U, Y1, V]. The output buffer is
/// reused across frames.
pub struct YuyvDecoder {
    rgb_buffer: Vec<u8>,
}

impl Default for YuyvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl YuyvDecoder {
    pub fn new() -> Self {
        Self {
            rgb_buffer: Vec::new(),
        }
    }

    /// Convert one raw frame. Rows may carry driver padding; the stride is
    /// derived from the payload length.
    pub fn decode(&mut self, raw: &[u8], width: u32, height: u32) -> Result<&[u8]> {
        let bytes_per_row = width as usize * 2;
        let rows = height as usize;

        if width % 2 != 0 {
            bail!("YUYV width must be even, got {}", width);
        }
        if rows == 0 || raw.len() < bytes_per_row * rows {
            bail!(
                "YUYV payload too short: {} bytes for {}x{}",
                raw.len(),
                width,
                height
            );
        }

        let rgb_size = width as usize * rows * 3;
        self.rgb_buffer.resize(rgb_size, 0);

        let stride = raw.len() / rows;
        let mut out = 0;
        for row in raw.chunks(stride).take(rows) {
            for chunk in row[..bytes_per_row].chunks_exact(4) {
                let y0 = chunk[0] as i32;
                let u = chunk[1] as i32 - 128;
                let y1 = chunk[2] as i32;
                let v = chunk[3] as i32 - 128;

                // BT.601 with 8-bit fixed point fractions
                let rv = (359 * v) >> 8;
                let gu = (88 * u + 183 * v) >> 8;
                let bu = (454 * u) >> 8;

                for y in [y0, y1] {
                    self.rgb_buffer[out] = (y + rv).clamp(0, 255) as u8;
                    self.rgb_buffer[out + 1] = (y - gu).clamp(0, 255) as u8;
                    self.rgb_buffer[out + 2] = (y + bu).clamp(0, 255) as u8;
                    out += 3;
                }
            }
        }

        Ok(&self.rgb_buffer[..rgb_size])
    }
}
