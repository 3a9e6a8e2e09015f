//! Colour-segmented safe zone extraction

use crate::hsv::HsvRange;
use crate::polygon::{shoelace_area, Polygon};
use frame_buffer::VideoFrame;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;
use tracing::{debug, trace};

/// Douglas-Peucker tolerance in pixels
pub const DEFAULT_APPROX_EPSILON: f64 = 5.0;

const MIN_APPROX_EPSILON: f64 = 0.1;

/// Extracts the safe-zone polygon from colour markings in a frame
#[derive(Debug, Clone)]
pub struct ZoneExtractor {
    range: HsvRange,
    epsilon: f64,
}

impl Default for ZoneExtractor {
    fn default() -> Self {
        Self::new(HsvRange::default())
    }
}

impl ZoneExtractor {
    pub fn new(range: HsvRange) -> Self {
        Self {
            range,
            epsilon: DEFAULT_APPROX_EPSILON,
        }
    }

    /// Override the polygon approximation tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.max(MIN_APPROX_EPSILON);
        self
    }

    pub fn range(&self) -> &HsvRange {
        &self.range
    }

    /// Binary mask of pixels inside the HSV range (255 = zone colour)
    pub fn mask(&self, frame: &VideoFrame) -> GrayImage {
        let mut mask = GrayImage::new(frame.width(), frame.height());
        for (i, rgb) in frame.rgb_pixels().enumerate() {
            if self.range.matches_rgb(rgb) {
                let x = (i % frame.width() as usize) as u32;
                let y = (i / frame.width() as usize) as u32;
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    /// Extract the zone polygon, or `None` when no zone is visible.
    ///
    /// Only the largest external region is used; smaller patches of the
    /// same colour are ignored.
    pub fn extract(&self, frame: &VideoFrame) -> Option<Polygon> {
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }

        let mask = self.mask(frame);
        let contours = find_contours::<i32>(&mask);
        trace!("Found {} contours in zone mask", contours.len());

        let largest = contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let area = contour_area(&c.points);
                (area, c.points)
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))?;

        if largest.1.len() < 3 {
            debug!("Largest zone contour too small (frame {})", frame.sequence);
            return None;
        }

        let approx = approximate_polygon_dp(&largest.1, self.epsilon, true);
        let polygon = Polygon::new(approx.iter().map(|p| (p.x, p.y)).collect());

        match &polygon {
            Some(p) => debug!(
                "Zone extracted: {} vertices, area {:.0} px (frame {})",
                p.len(),
                p.area(),
                frame.sequence
            ),
            None => debug!(
                "Largest zone contour degenerate after simplification (frame {})",
                frame.sequence
            ),
        }

        polygon
    }
}

fn contour_area(points: &[Point<i32>]) -> f64 {
    let pts: Vec<(i32, i32)> = points.iter().map(|p| (p.x, p.y)).collect();
    shoelace_area(&pts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_buffer::ChannelOrder;

    const GREEN: [u8; 3] = [40, 190, 60];
    const GREY: [u8; 3] = [90, 90, 90];

    fn frame_with_rects(
        width: u32,
        height: u32,
        rects: &[(u32, u32, u32, u32)],
        order: ChannelOrder,
    ) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = rects
                    .iter()
                    .any(|&(x0, y0, x1, y1)| x >= x0 && x <= x1 && y >= y0 && y <= y1);
                let px = if inside { GREEN } else { GREY };
                match order {
                    ChannelOrder::Rgb => data.extend_from_slice(&px),
                    ChannelOrder::Bgr => data.extend_from_slice(&[px[2], px[1], px[0]]),
                }
            }
        }
        VideoFrame::new(data, width, height, order, 0, 0).unwrap()
    }

    #[test]
    fn test_no_zone_colour_returns_none() {
        let frame = frame_with_rects(64, 48, &[], ChannelOrder::Rgb);
        assert!(ZoneExtractor::default().extract(&frame).is_none());
    }

    #[test]
    fn test_empty_frame_returns_none() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, ChannelOrder::Rgb, 0, 0).unwrap();
        assert!(ZoneExtractor::default().extract(&frame).is_none());
    }

    #[test]
    fn test_rectangle_zone() {
        let frame = frame_with_rects(160, 120, &[(20, 30, 120, 100)], ChannelOrder::Rgb);
        let zone = ZoneExtractor::default().extract(&frame).unwrap();

        assert!(zone.len() >= 4, "got {:?}", zone.points());
        let (x0, y0, x1, y1) = zone.bounds();
        assert_eq!((x0, y0, x1, y1), (20, 30, 120, 100));
        assert!(zone.contains((70.0, 65.0)));
        assert!(!zone.contains((140.0, 65.0)));
    }

    #[test]
    fn test_bgr_frame_matches_rgb() {
        let rgb = frame_with_rects(80, 60, &[(10, 10, 50, 40)], ChannelOrder::Rgb);
        let bgr = frame_with_rects(80, 60, &[(10, 10, 50, 40)], ChannelOrder::Bgr);
        let extractor = ZoneExtractor::default();
        assert_eq!(extractor.extract(&rgb), extractor.extract(&bgr));
    }

    #[test]
    fn test_largest_region_wins() {
        let frame = frame_with_rects(
            200,
            120,
            &[(5, 5, 15, 15), (60, 20, 180, 110)],
            ChannelOrder::Rgb,
        );
        let zone = ZoneExtractor::default().extract(&frame).unwrap();
        assert!(zone.contains((120.0, 60.0)));
        assert!(!zone.contains((10.0, 10.0)));
    }

    #[test]
    fn test_single_pixel_is_degenerate() {
        let frame = frame_with_rects(32, 32, &[(10, 10, 10, 10)], ChannelOrder::Rgb);
        assert!(ZoneExtractor::default().extract(&frame).is_none());
    }

    #[test]
    fn test_mask_counts_zone_pixels() {
        let frame = frame_with_rects(20, 20, &[(0, 0, 4, 4)], ChannelOrder::Rgb);
        let mask = ZoneExtractor::default().mask(&frame);
        let on = mask.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(on, 25);
    }
}
