//! Video frame types and processing

use crate::FrameError;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Channel order of the packed pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    /// Blue-green-red, as delivered by most capture stacks
    Bgr,
}

/// Decoded 3-channel video frame.
///
/// Pixel data and dimensions are only set through constructors, so the
/// buffer always holds `width * height * 3` bytes.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Packed pixel data (width * height * 3)
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// Channel order of `data`
    pub order: ChannelOrder,
    /// Arrival timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a frame from packed pixel data, checking the buffer length
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        order: ChannelOrder,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            order,
            timestamp_ns,
            sequence,
        })
    }

    /// Wrap an RGB image as a frame
    pub fn from_rgb_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            order: ChannelOrder::Rgb,
            timestamp_ns,
            sequence,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed pixel data in `order`
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get pixel at (x, y) as `[r, g, b]` regardless of channel order
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = [self.data[idx], self.data[idx + 1], self.data[idx + 2]];
        Some(match self.order {
            ChannelOrder::Rgb => px,
            ChannelOrder::Bgr => [px[2], px[1], px[0]],
        })
    }

    /// Iterate pixels in row-major order as `[r, g, b]`
    pub fn rgb_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        let order = self.order;
        self.data.chunks_exact(3).map(move |px| match order {
            ChannelOrder::Rgb => [px[0], px[1], px[2]],
            ChannelOrder::Bgr => [px[2], px[1], px[0]],
        })
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Result<VideoFrame, FrameError> {
        if x.saturating_add(w) > self.width || y.saturating_add(h) > self.height {
            return Err(FrameError::CropOutOfBounds {
                x,
                y,
                w,
                h,
                width: self.width,
                height: self.height,
            });
        }

        let mut cropped = Vec::with_capacity(w as usize * h as usize * 3);
        for row in y..(y + h) {
            let start = (row as usize * self.width as usize + x as usize) * 3;
            let end = start + w as usize * 3;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Ok(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            order: self.order,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Convert to an RGB image buffer
    pub fn to_rgb_image(&self) -> RgbImage {
        let data: Vec<u8> = match self.order {
            ChannelOrder::Rgb => self.data.clone(),
            ChannelOrder::Bgr => self.rgb_pixels().flatten().collect(),
        };
        // Length is checked at construction
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Encode the frame as JPEG for evidence snapshots
    pub fn encode_jpeg(&self) -> Result<Vec<u8>, FrameError> {
        let image = self.to_rgb_image();
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| FrameError::Encode(e.to_string()))?;

        let bytes = buf.into_inner();
        debug!(
            "Encoded frame {} ({}x{}) to {} bytes",
            self.sequence,
            self.width,
            self.height,
            bytes.len()
        );
        Ok(bytes)
    }
}
