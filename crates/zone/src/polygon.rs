//! Zone polygon and containment test

use serde::{Deserialize, Serialize};

/// Simplified closed contour with at least three vertices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(i32, i32)>", into = "Vec<(i32, i32)>")]
pub struct Polygon {
    points: Vec<(i32, i32)>,
}

impl Polygon {
    /// Build a polygon from ordered vertices.
    ///
    /// Consecutive duplicates and a repeated closing vertex are dropped.
    /// Returns `None` if fewer than three distinct vertices remain.
    pub fn new(mut points: Vec<(i32, i32)>) -> Option<Self> {
        points.dedup();
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Absolute area (shoelace formula)
    pub fn area(&self) -> f64 {
        shoelace_area(&self.points)
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        self.points.iter().fold(
            (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Test whether a point lies inside the polygon
    pub fn contains(&self, point: (f64, f64)) -> bool {
        let (px, py) = point;
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = (self.points[i].0 as f64, self.points[i].1 as f64);
            let (xj, yj) = (self.points[j].0 as f64, self.points[j].1 as f64);

            if (yi > py) != (yj > py) {
                let x_cross = xi + (py - yi) * (xj - xi) / (yj - yi);
                if px < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }
}

impl TryFrom<Vec<(i32, i32)>> for Polygon {
    type Error = String;

    fn try_from(points: Vec<(i32, i32)>) -> Result<Self, Self::Error> {
        let count = points.len();
        Polygon::new(points).ok_or_else(|| format!("polygon needs 3 distinct vertices, got {count}"))
    }
}

impl From<Polygon> for Vec<(i32, i32)> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

/// Containment test used by callers holding an optional zone.
///
/// Callers must skip containment entirely when no zone was found; this
/// function only answers for a concrete polygon.
pub fn contains(polygon: &Polygon, point: (f64, f64)) -> bool {
    polygon.contains(point)
}

pub(crate) fn shoelace_area(points: &[(i32, i32)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}
