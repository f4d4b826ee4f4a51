//! In-process hand-off of encoded camera frames from one producer to many
//! streaming consumers.

pub mod frame;
pub mod frame_buffer;

pub use frame::Frame;
pub use frame_buffer::{FrameBuffer, Generation};
