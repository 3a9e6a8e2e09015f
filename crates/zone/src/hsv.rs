//! HSV conversion and colour ranges
//!
//! Uses the 8-bit convention of common vision toolkits: hue in `[0, 179]`
//! (degrees halved), saturation and value in `[0, 255]`, so calibrated
//! ranges carry over unchanged.

use serde::{Deserialize, Serialize};

/// Convert an RGB pixel to 8-bit HSV `(h: 0-179, s: 0-255, v: 0-255)`
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let h = if delta <= 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    (
        ((h / 2.0).round() as u16 % 180) as u8,
        s.round() as u8,
        v.round() as u8,
    )
}

/// Inclusive HSV threshold range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for HsvRange {
    /// Green floor marking
    fn default() -> Self {
        Self::green()
    }
}

impl HsvRange {
    pub fn green() -> Self {
        Self {
            lower: [35, 40, 40],
            upper: [85, 255, 255],
        }
    }

    /// Safety-yellow floor tape
    pub fn yellow() -> Self {
        Self {
            lower: [20, 100, 100],
            upper: [34, 255, 255],
        }
    }

    /// Check whether an HSV triple falls inside the range
    pub fn contains(&self, hsv: (u8, u8, u8)) -> bool {
        let (h, s, v) = hsv;
        (self.lower[0]..=self.upper[0]).contains(&h)
            && (self.lower[1]..=self.upper[1]).contains(&s)
            && (self.lower[2]..=self.upper[2]).contains(&v)
    }

    /// Check an RGB pixel against the range
    pub fn matches_rgb(&self, rgb: [u8; 3]) -> bool {
        self.contains(rgb_to_hsv(rgb[0], rgb[1], rgb[2]))
    }
}
