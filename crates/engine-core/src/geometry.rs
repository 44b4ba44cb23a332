//! Geometry kernel: points, segment distances, bezier evaluation and
//! arc-length helpers. Everything here is a pure function on values.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    #[inline]
    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Reflect `self` through `center` (used for smooth curve commands).
    #[inline]
    pub fn reflect_about(self, center: Point) -> Point {
        Point::new(2.0 * center.x - self.x, 2.0 * center.y - self.y)
    }

    pub fn approx_eq(self, other: Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in f64 user space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Bounding box of a point cloud; `None` when empty.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Squared distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment_sq(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_sq(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_sq(Point::new(a.x + t * dx, a.y + t * dy))
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    distance_to_segment_sq(p, a, b).sqrt()
}

/// Evaluate a quadratic bezier at `t`.
pub fn quad_point(p0: Point, c: Point, p1: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    Point::new(
        mt * mt * p0.x + 2.0 * mt * t * c.x + t * t * p1.x,
        mt * mt * p0.y + 2.0 * mt * t * c.y + t * t * p1.y,
    )
}

/// Evaluate a cubic bezier at `t`.
pub fn cubic_point(p0: Point, c1: Point, c2: Point, p1: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * c1.x + c * c2.x + d * p1.x,
        a * p0.y + b * c1.y + c * c2.y + d * p1.y,
    )
}

/// Total length of an open polyline.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Cumulative distance at each vertex of a polyline; first entry is 0.
pub fn cumulative_lengths(points: &[Point]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += points[i - 1].distance(*p);
        }
        out.push(acc);
    }
    out
}

/// Resample a polyline into `steps + 1` points evenly spaced by arc length.
///
/// Returns the input unchanged when it has fewer than two points or zero length.
pub fn resample_by_arc_length(points: &[Point], steps: usize) -> Vec<Point> {
    if points.len() < 2 || steps == 0 {
        return points.to_vec();
    }
    let cumulative = cumulative_lengths(points);
    let total = cumulative[cumulative.len() - 1];
    if total <= f64::EPSILON {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(steps + 1);
    let mut seg = 0usize;
    for i in 0..=steps {
        let target = total * (i as f64) / (steps as f64);
        while seg + 1 < cumulative.len() - 1 && cumulative[seg + 1] < target {
            seg += 1;
        }
        let span = cumulative[seg + 1] - cumulative[seg];
        let t = if span > 0.0 {
            ((target - cumulative[seg]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(points[seg].lerp(points[seg + 1], t));
    }
    out
}

/// Signed polygon area (shoelace). Positive for counter-clockwise in y-up space.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn segment_distance_projects_inside() {
        let d = distance_to_segment(Point::new(5.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!(approx_eq(d, 3.0));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d = distance_to_segment_sq(Point::new(13.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!(approx_eq(d, 25.0));
        // Degenerate segment collapses to point distance.
        let d = distance_to_segment(Point::new(3.0, 4.0), Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        assert!(approx_eq(d, 5.0));
    }

    #[test]
    fn bezier_endpoints_and_midpoint() {
        let p0 = Point::new(0.0, 0.0);
        let p1 = Point::new(10.0, 0.0);
        let c = Point::new(5.0, 10.0);
        assert_eq!(quad_point(p0, c, p1, 0.0), p0);
        assert_eq!(quad_point(p0, c, p1, 1.0), p1);
        assert!(approx_eq(quad_point(p0, c, p1, 0.5).y, 5.0));

        let mid = cubic_point(p0, Point::new(0.0, 10.0), Point::new(10.0, 10.0), p1, 0.5);
        assert!(approx_eq(mid.x, 5.0));
        assert!(approx_eq(mid.y, 7.5));
    }

    #[test]
    fn resample_spacing_is_uniform() {
        let pts = [Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 70.0)];
        let out = resample_by_arc_length(&pts, 10);
        assert_eq!(out.len(), 11);
        assert!(approx_eq(polyline_length(&out), 100.0));
        for w in out.windows(2) {
            assert!((w[0].distance(w[1]) - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn shoelace_area_of_square() {
        let sq = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(approx_eq(signed_area(&sq).abs(), 4.0));
    }
}
