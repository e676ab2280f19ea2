use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Cubic bezier used to draw a link as a thick stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkPath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl LinkPath {
    /// S-shaped connector leaving `start` and entering `end` horizontally,
    /// with both control points at the horizontal midpoint.
    pub fn horizontal(start: Point, end: Point) -> Self {
        let mid_x = (start.x + end.x) / 2.0;
        Self {
            start,
            control1: Point::new(mid_x, start.y),
            control2: Point::new(mid_x, end.y),
            end,
        }
    }

    /// Sample the curve at parameter t [0, 1]
    pub fn sample(&self, t: f64) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = self.start.x * mt3
            + 3.0 * self.control1.x * mt2 * t
            + 3.0 * self.control2.x * mt * t2
            + self.end.x * t3;
        let y = self.start.y * mt3
            + 3.0 * self.control1.y * mt2 * t
            + 3.0 * self.control2.y * mt * t2
            + self.end.y * t3;

        Point::new(x, y)
    }

    /// Minimum distance from `point` to the curve, approximated by uniform
    /// sampling. More samples is more precise.
    pub fn point_distance(&self, point: Point, num_samples: usize) -> f64 {
        let samples = num_samples.max(2);
        (0..=samples)
            .map(|i| self.sample(i as f64 / samples as f64).distance(point))
            .fold(f64::INFINITY, f64::min)
    }

    /// SVG path data (`M .. C ..`).
    pub fn to_svg_path(&self) -> String {
        let mut d = String::with_capacity(64);
        let _ = write!(
            d,
            "M{},{}C{},{} {},{} {},{}",
            fmt_coord(self.start.x),
            fmt_coord(self.start.y),
            fmt_coord(self.control1.x),
            fmt_coord(self.control1.y),
            fmt_coord(self.control2.x),
            fmt_coord(self.control2.y),
            fmt_coord(self.end.x),
            fmt_coord(self.end.y),
        );
        d
    }
}

/// Three decimals, trailing zeros trimmed.
fn fmt_coord(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
