//! Safe Zone Geometry
//!
//! Derives the designated safe zone from a frame and tests containment:
//! - HSV colour thresholding of floor markings
//! - Largest external contour, simplified to a polygon
//! - Point-in-polygon test on an entity's reference point
//!
//! A missing zone is a normal state meaning "no containment constraint".

pub mod extractor;
pub mod hsv;
pub mod polygon;

pub use extractor::{ZoneExtractor, DEFAULT_APPROX_EPSILON};
pub use hsv::{rgb_to_hsv, HsvRange};
pub use polygon::{contains, Polygon};
