pub mod config;
pub mod decoder;
pub mod device;
pub mod encoder;
pub mod pacing;
pub mod producer;
pub mod source;
pub mod transform;

pub use config::{CaptureBackend, CaptureConfig};
pub use decoder::YuyvDecoder;
pub use device::{CameraDevice, PixelFormat};
pub use encoder::JpegEncoder;
pub use pacing::CapturePacing;
pub use producer::{CLOSE_TIMEOUT, FrameProducer, ProducerHandle, ProducerStats};
pub use source::{CaptureSource, HardwareJpegSource, SoftwareJpegSource, open_source};
pub use transform::{FrameTransform, Orientation};
