//! Anchor-based vector paths.
//!
//! A path is an ordered list of [`Anchor`]s plus a `closed` flag. The kind of
//! each segment is never stored: it is derived from which control points the
//! two anchors around it carry (see [`segments`]).

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Point, Rect};
use crate::transform::Transform2D;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    /// Incoming control point (shapes the segment that ends here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp1: Option<Point>,
    /// Outgoing control point (shapes the segment that starts here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp2: Option<Point>,
}

impl Anchor {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            cp1: None,
            cp2: None,
        }
    }

    pub fn with_controls(x: f64, y: f64, cp1: Option<Point>, cp2: Option<Point>) -> Self {
        Self { x, y, cp1, cp2 }
    }

    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn transformed(&self, t: &Transform2D) -> Anchor {
        let p = t.apply(self.point());
        Anchor {
            x: p.x,
            y: p.y,
            cp1: self.cp1.map(|c| t.apply(c)),
            cp2: self.cp2.map(|c| t.apply(c)),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.point().is_finite()
            && self.cp1.is_none_or(|c| c.is_finite())
            && self.cp2.is_none_or(|c| c.is_finite())
    }
}

/// A derived segment between two consecutive anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    Line(Point, Point),
    Quad(Point, Point, Point),
    Cubic(Point, Point, Point, Point),
}

impl Segment {
    /// Segment from `from` to `to`: both controls present makes a cubic, one
    /// makes a quadratic, none a straight line.
    pub fn between(from: &Anchor, to: &Anchor) -> Segment {
        let p0 = from.point();
        let p1 = to.point();
        match (from.cp2, to.cp1) {
            (Some(c1), Some(c2)) => Segment::Cubic(p0, c1, c2, p1),
            (Some(c), None) | (None, Some(c)) => Segment::Quad(p0, c, p1),
            (None, None) => Segment::Line(p0, p1),
        }
    }

    pub fn start(&self) -> Point {
        match *self {
            Segment::Line(p, _) | Segment::Quad(p, _, _) | Segment::Cubic(p, _, _, _) => p,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            Segment::Line(_, p) | Segment::Quad(_, _, p) | Segment::Cubic(_, _, _, p) => p,
        }
    }

    pub fn eval(&self, t: f64) -> Point {
        match *self {
            Segment::Line(a, b) => a.lerp(b, t),
            Segment::Quad(a, c, b) => geometry::quad_point(a, c, b, t),
            Segment::Cubic(a, c1, c2, b) => geometry::cubic_point(a, c1, c2, b, t),
        }
    }

    /// Push sample points for t in (0, 1] onto `out`. Lines contribute only
    /// their end point; curves contribute `steps` points.
    pub fn flatten_into(&self, steps: usize, out: &mut Vec<Point>) {
        match self {
            Segment::Line(_, b) => out.push(*b),
            _ => {
                let steps = steps.max(1);
                for i in 1..=steps {
                    out.push(self.eval(i as f64 / steps as f64));
                }
            }
        }
    }

    /// Arc length approximated by fixed-step sampling.
    pub fn length(&self, steps: usize) -> f64 {
        match self {
            Segment::Line(a, b) => a.distance(*b),
            _ => {
                let mut pts = vec![self.start()];
                self.flatten_into(steps, &mut pts);
                geometry::polyline_length(&pts)
            }
        }
    }
}

/// Derived segments of an anchor list. A closed path gets a final segment from
/// the last anchor back to the first. Fewer than two anchors yields nothing.
pub fn segments(anchors: &[Anchor], closed: bool) -> Vec<Segment> {
    if anchors.len() < 2 {
        return Vec::new();
    }
    let mut out: Vec<Segment> = anchors
        .windows(2)
        .map(|w| Segment::between(&w[0], &w[1]))
        .collect();
    if closed {
        out.push(Segment::between(&anchors[anchors.len() - 1], &anchors[0]));
    }
    out
}

/// Whether an anchor list can be stroked or filled at all.
pub fn is_renderable(anchors: &[Anchor]) -> bool {
    anchors.len() >= 2 && anchors.iter().all(Anchor::is_finite)
}

/// Flatten to a polyline with `steps` samples per curved segment. Closed paths
/// end with a copy of the first point.
pub fn flatten(anchors: &[Anchor], closed: bool, steps: usize) -> Vec<Point> {
    let segs = segments(anchors, closed);
    let Some(first) = segs.first() else {
        return anchors.iter().map(Anchor::point).collect();
    };
    let mut out = vec![first.start()];
    for seg in &segs {
        seg.flatten_into(steps, &mut out);
    }
    out
}

/// Total arc length, sampling each curved segment with `steps` points.
pub fn length(anchors: &[Anchor], closed: bool, steps: usize) -> f64 {
    segments(anchors, closed).iter().map(|s| s.length(steps)).sum()
}

/// Sample the path at `steps` even arc-length intervals (`steps + 1` points).
pub fn sample_by_arc_length(anchors: &[Anchor], closed: bool, steps: usize) -> Vec<Point> {
    let dense = flatten(anchors, closed, 32);
    geometry::resample_by_arc_length(&dense, steps)
}

/// Bounding box of anchors and control points (a conservative curve bound).
pub fn bounds(anchors: &[Anchor]) -> Option<Rect> {
    Rect::from_points(
        anchors
            .iter()
            .flat_map(|a| [Some(a.point()), a.cp1, a.cp2])
            .flatten(),
    )
}

pub fn transform_anchors(anchors: &[Anchor], t: &Transform2D) -> Vec<Anchor> {
    anchors.iter().map(|a| a.transformed(t)).collect()
}

/// Result of [`closest_segment`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
    /// Index of the segment's start anchor; the closing segment of a closed
    /// path reports the last anchor.
    pub index: usize,
    pub distance: f64,
}

/// Find the segment nearest to `p`, the search behind path editing (inserting
/// an anchor where the user clicks). Curves are measured against a sampled
/// polyline.
pub fn closest_segment(anchors: &[Anchor], closed: bool, p: Point) -> Option<SegmentHit> {
    const CURVE_STEPS: usize = 24;
    let mut best: Option<(usize, f64)> = None;
    for (index, seg) in segments(anchors, closed).iter().enumerate() {
        let mut pts = vec![seg.start()];
        seg.flatten_into(CURVE_STEPS, &mut pts);
        let d = pts
            .windows(2)
            .map(|w| geometry::distance_to_segment_sq(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((index, d));
        }
    }
    best.map(|(index, d)| SegmentHit {
        index,
        distance: d.sqrt(),
    })
}

/// Canonical form used by the path codec.
///
/// A quadratic segment's single control point is attached to the segment's
/// start anchor (`cp2`) when decoded, so a lone incoming `cp1` whose
/// predecessor has no `cp2` is moved there. On open paths the controls that
/// shape no segment (first `cp1`, last `cp2`) are dropped. Geometry is
/// unchanged.
pub fn normalize(anchors: &[Anchor], closed: bool) -> Vec<Anchor> {
    let mut out = anchors.to_vec();
    let n = out.len();
    if n < 2 {
        return out;
    }
    let pairs = if closed { n } else { n - 1 };
    for i in 0..pairs {
        let j = (i + 1) % n;
        if out[i].cp2.is_none() {
            if let Some(c) = out[j].cp1.take() {
                out[i].cp2 = Some(c);
            }
        }
    }
    if !closed {
        out[0].cp1 = None;
        out[n - 1].cp2 = None;
    }
    out
}
