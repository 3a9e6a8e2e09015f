//! Frame annotation for evidence snapshots

use compliance::{BBox, ComplianceResult, Detection};
use frame_buffer::VideoFrame;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use zone::Polygon;

const ZONE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const COMPLIANT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const VIOLATING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const EQUIPMENT_COLOR: Rgb<u8> = Rgb([255, 165, 0]);

const LINE_THICKNESS: u32 = 2;
const POINT_RADIUS: i32 = 5;

/// Draw the zone outline, other detections, and per-entity results.
///
/// The returned frame is in RGB channel order.
pub fn annotate(
    frame: &VideoFrame,
    zone: Option<&Polygon>,
    results: &[ComplianceResult],
    others: &[Detection],
) -> VideoFrame {
    let mut image = frame.to_rgb_image();

    if let Some(polygon) = zone {
        draw_polygon_outline(&mut image, polygon);
    }

    for det in others {
        draw_box(&mut image, &det.bbox, EQUIPMENT_COLOR);
    }

    for result in results {
        let color = if result.is_violating() {
            VIOLATING_COLOR
        } else {
            COMPLIANT_COLOR
        };
        draw_box(&mut image, &result.entity.bbox, color);

        let (x, y) = result.entity.reference_point();
        draw_filled_circle_mut(&mut image, (x as i32, y as i32), POINT_RADIUS, color);
    }

    VideoFrame::from_rgb_image(image, frame.timestamp_ns, frame.sequence)
}

fn draw_polygon_outline(image: &mut RgbImage, polygon: &Polygon) {
    let points = polygon.points();
    for (i, &(x0, y0)) in points.iter().enumerate() {
        let (x1, y1) = points[(i + 1) % points.len()];
        for offset in 0..LINE_THICKNESS as i32 {
            let o = offset as f32;
            draw_line_segment_mut(
                image,
                (x0 as f32 + o, y0 as f32 + o),
                (x1 as f32 + o, y1 as f32 + o),
                ZONE_COLOR,
            );
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BBox, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    // Nothing visible to draw
    if bbox.x2 < 0.0 || bbox.y2 < 0.0 || bbox.x1 >= width as f32 || bbox.y1 >= height as f32 {
        return;
    }

    let x1 = (bbox.x1.max(0.0) as u32).min(width - 1);
    let y1 = (bbox.y1.max(0.0) as u32).min(height - 1);
    let x2 = (bbox.x2.max(0.0) as u32).min(width - 1);
    let y2 = (bbox.y2.max(0.0) as u32).min(height - 1);

    for t in 0..LINE_THICKNESS {
        let w = (x2 + 1).saturating_sub(x1).saturating_sub(2 * t);
        let h = (y2 + 1).saturating_sub(y1).saturating_sub(2 * t);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((x1 + t) as i32, (y1 + t) as i32).of_size(w, h);
        draw_hollow_rect_mut(image, rect, color);
    }
}
