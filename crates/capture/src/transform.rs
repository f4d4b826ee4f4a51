use anyhow::{Context, Result};
use bridge::Frame;
use turbojpeg::{Transform, TransformOp, Transformer};

/// Fixed mounting correction applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    /// Horizontal plus vertical flip, for cameras mounted upside down.
    Rotate180,
}

/// Applies the configured orientation to encoded frames.
///
/// Rotation is done losslessly on the JPEG's DCT blocks, so both capture
/// backends go through the exact same path and no re-encode happens.
pub struct FrameTransform {
    orientation: Orientation,
    transformer: Option<Transformer>,
}

impl FrameTransform {
    pub fn new(orientation: Orientation) -> Result<Self> {
        let transformer = match orientation {
            Orientation::Normal => None,
            Orientation::Rotate180 => {
                Some(Transformer::new().context("Failed to create JPEG transformer")?)
            }
        };
        Ok(Self {
            orientation,
            transformer,
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn apply(&mut self, frame: Frame) -> Result<Frame> {
        let Some(transformer) = self.transformer.as_mut() else {
            return Ok(frame);
        };

        let mut rotate = Transform::op(TransformOp::Rot180);
        // Partial edge blocks cannot be rotated losslessly. Fail instead of
        // publishing a frame smaller than the configured size.
        rotate.perfect = true;

        let rotated = transformer
            .transform(&rotate, &frame)
            .context("JPEG rotation failed")?;
        Ok(Frame::from(rotated.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::JpegEncoder;

    /// Left half black, right half white.
    fn split_frame(width: u32, height: u32) -> Frame {
        let pixels: Vec<u8> = (0..height)
            .flat_map(|_| {
                (0..width).flat_map(move |x| if x < width / 2 { [0u8; 3] } else { [255u8; 3] })
            })
            .collect();
        let jpeg = JpegEncoder::new(90)
            .unwrap()
            .encode_rgb(&pixels, width, height)
            .unwrap();
        Frame::from(jpeg)
    }

    fn left_edge_brightness(frame: &Frame) -> u8 {
        let image = turbojpeg::decompress(frame, turbojpeg::PixelFormat::GRAY).unwrap();
        image.pixels[image.pitch * (image.height / 2) + 2]
    }

    #[test]
    fn normal_orientation_passes_frame_through() {
        let frame = split_frame(32, 32);
        let mut transform = FrameTransform::new(Orientation::Normal).unwrap();

        let out = transform.apply(frame.clone()).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn rotate_180_swaps_left_and_right() {
        let frame = split_frame(32, 32);
        assert!(left_edge_brightness(&frame) < 40);

        let mut transform = FrameTransform::new(Orientation::Rotate180).unwrap();
        let rotated = transform.apply(frame).unwrap();

        let header = turbojpeg::read_header(&rotated).unwrap();
        assert_eq!((header.width, header.height), (32, 32));
        assert!(left_edge_brightness(&rotated) > 215);
    }

    #[test]
    fn misaligned_frame_is_rejected_not_shrunk() {
        let mut transform = FrameTransform::new(Orientation::Rotate180).unwrap();
        assert!(transform.apply(split_frame(40, 40)).is_err());
    }

    #[test]
    fn garbage_input_is_an_error() {
        let mut transform = FrameTransform::new(Orientation::Rotate180).unwrap();
        assert!(transform.apply(Frame::from(&b"not a jpeg"[..])).is_err());
    }
}
