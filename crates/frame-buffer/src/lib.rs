//! Frame Buffer
//!
//! Pixel grid handed over by the video source collaborator:
//! - Packed 8-bit, 3-channel frames in RGB or BGR order
//! - Arrival timestamp and sequence number per frame
//! - Cropping, RGB conversion and JPEG snapshot encoding

pub mod frame;

pub use frame::{ChannelOrder, VideoFrame};

use thiserror::Error;

/// Frame error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Crop region {x},{y} {w}x{h} outside {width}x{height} frame")]
    CropOutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },

    #[error("Snapshot encoding failed: {0}")]
    Encode(String),
}
