//! Freehand brush strokes.
//!
//! The anchors of a brushed path node are raw pointer samples. Pencil and
//! pressure brushes become a filled outline whose half-width follows the
//! per-point pressure, the marker becomes a fixed-width stroke along the
//! centerline, and the spray becomes a cloud of dots.

use std::f64::consts::TAU;

use engine_core::{Anchor, Point, RandomSource, StrokeStyle, Subpath, XorShift};

use crate::model::{BrushKind, BrushMeta};

/// Pressure assumed for samples without a recorded value.
const DEFAULT_PRESSURE: f32 = 0.5;
/// Dots per sample for the spray brush.
const SPRAY_DENSITY: usize = 12;
/// Segments used to approximate each end cap.
const CAP_STEPS: usize = 6;

/// What a brushed stroke draws.
#[derive(Clone, Debug, PartialEq)]
pub enum BrushOutput {
    /// Closed outline filled with the brush color.
    Outline(Subpath),
    /// Open centerline stroked with a fixed width.
    Centerline(Subpath, StrokeStyle),
    /// Dots as (center, radius).
    Dots(Vec<(Point, f64)>),
    Nothing,
}

/// Outline generation for one brushed stroke. `seed_key` seeds the spray so
/// the same node always scatters the same dots.
pub fn brush_output(points: &[Point], brush: &BrushMeta, seed_key: &str) -> BrushOutput {
    let points = dedup(points);
    if points.is_empty() || !(brush.size > 0.0) {
        return BrushOutput::Nothing;
    }
    match brush.kind {
        BrushKind::Marker => {
            if points.len() < 2 {
                return BrushOutput::Dots(vec![(points[0], brush.size * 0.5)]);
            }
            let mut style = StrokeStyle::solid(brush.size, brush.color);
            style.cap = engine_core::LineCap::Round;
            BrushOutput::Centerline(
                Subpath {
                    anchors: points.iter().map(|p| Anchor::new(p.x, p.y)).collect(),
                    closed: false,
                },
                style,
            )
        }
        BrushKind::Spray => {
            let mut rng = XorShift::from_key(seed_key);
            BrushOutput::Dots(spray(&points, brush.size, &mut rng))
        }
        BrushKind::Pencil | BrushKind::Pressure => {
            let widths: Vec<f64> = (0..points.len())
                .map(|i| half_width(brush, i))
                .collect();
            if points.len() < 2 {
                return BrushOutput::Dots(vec![(points[0], widths[0])]);
            }
            BrushOutput::Outline(outline(&points, &widths))
        }
    }
}

fn dedup(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().copied().filter(|p| p.is_finite()) {
        if out.last().is_none_or(|last| !last.approx_eq(p, 1e-9)) {
            out.push(p);
        }
    }
    out
}

fn half_width(brush: &BrushMeta, index: usize) -> f64 {
    match brush.kind {
        // Pencil pressure only nudges the width.
        BrushKind::Pencil => {
            let p = brush.pressures.get(index).copied().unwrap_or(DEFAULT_PRESSURE);
            brush.size * 0.25 * (0.75 + 0.5 * p.clamp(0.0, 1.0) as f64)
        }
        _ => {
            let p = brush.pressures.get(index).copied().unwrap_or(DEFAULT_PRESSURE);
            brush.size * 0.5 * (0.15 + 0.85 * p.clamp(0.0, 1.0) as f64)
        }
    }
}

fn unit_normal(a: Point, b: Point) -> Point {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f64::EPSILON {
        Point::new(0.0, 0.0)
    } else {
        Point::new(-dy / len, dx / len)
    }
}

/// Left side forward, round cap, right side backward, round cap.
fn outline(points: &[Point], widths: &[f64]) -> Subpath {
    let n = points.len();
    let normals: Vec<Point> = (0..n)
        .map(|i| {
            let prev = points[i.saturating_sub(1)];
            let next = points[(i + 1).min(n - 1)];
            unit_normal(prev, next)
        })
        .collect();

    let offset = |i: usize, side: f64| {
        let p = points[i];
        let nrm = normals[i];
        Point::new(p.x + nrm.x * widths[i] * side, p.y + nrm.y * widths[i] * side)
    };

    let mut ring = Vec::with_capacity(2 * n + 2 * CAP_STEPS);
    for i in 0..n {
        ring.push(offset(i, 1.0));
    }
    cap(&mut ring, points[n - 1], normals[n - 1], widths[n - 1]);
    for i in (0..n).rev() {
        ring.push(offset(i, -1.0));
    }
    let start_normal = Point::new(-normals[0].x, -normals[0].y);
    cap(&mut ring, points[0], start_normal, widths[0]);

    Subpath {
        anchors: ring.into_iter().map(|p| Anchor::new(p.x, p.y)).collect(),
        closed: true,
    }
}

/// Half circle from the `normal` side to the opposite side, bulging forward.
fn cap(ring: &mut Vec<Point>, center: Point, normal: Point, radius: f64) {
    let start = normal.y.atan2(normal.x);
    for step in 1..CAP_STEPS {
        let a = start - std::f64::consts::PI * step as f64 / CAP_STEPS as f64;
        ring.push(Point::new(
            center.x + radius * a.cos(),
            center.y + radius * a.sin(),
        ));
    }
}

fn spray(points: &[Point], size: f64, rng: &mut dyn RandomSource) -> Vec<(Point, f64)> {
    let radius = size * 0.5;
    let dot = (size / 16.0).max(0.5);
    let mut dots = Vec::with_capacity(points.len() * SPRAY_DENSITY);
    for p in points {
        for _ in 0..SPRAY_DENSITY {
            // sqrt keeps the density uniform over the disc.
            let r = radius * rng.next_f64().sqrt();
            let a = rng.range(0.0, TAU);
            dots.push((Point::new(p.x + r * a.cos(), p.y + r * a.sin()), dot));
        }
    }
    dots
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Color, geometry};

    fn brush(kind: BrushKind) -> BrushMeta {
        BrushMeta {
            kind,
            size: 10.0,
            color: Color::BLACK,
            pressures: Vec::new(),
        }
    }

    fn line() -> Vec<Point> {
        (0..=10).map(|i| Point::new(i as f64 * 10.0, 0.0)).collect()
    }

    #[test]
    fn pressure_outline_wraps_the_centerline() {
        let mut b = brush(BrushKind::Pressure);
        b.pressures = vec![1.0; 11];
        let BrushOutput::Outline(sub) = brush_output(&line(), &b, "n") else {
            panic!("expected outline");
        };
        assert!(sub.closed);
        let pts: Vec<Point> = sub.anchors.iter().map(|a| a.point()).collect();
        let ys: Vec<f64> = pts.iter().map(|p| p.y).collect();
        let max = ys.iter().cloned().fold(f64::MIN, f64::max);
        let min = ys.iter().cloned().fold(f64::MAX, f64::min);
        assert!((max - 5.0).abs() < 1e-9 && (min + 5.0).abs() < 1e-9);
        // Full-pressure band of 100 x 10 plus two caps.
        let area = geometry::signed_area(&pts).abs();
        assert!(area > 1000.0 && area < 1000.0 + std::f64::consts::PI * 25.0 + 1.0, "{area}");
    }

    #[test]
    fn pressure_changes_width() {
        let mut light = brush(BrushKind::Pressure);
        light.pressures = vec![0.0; 11];
        let mut heavy = brush(BrushKind::Pressure);
        heavy.pressures = vec![1.0; 11];
        let area = |b: &BrushMeta| match brush_output(&line(), b, "n") {
            BrushOutput::Outline(s) => {
                let pts: Vec<Point> = s.anchors.iter().map(|a| a.point()).collect();
                geometry::signed_area(&pts).abs()
            }
            _ => 0.0,
        };
        assert!(area(&heavy) > 3.0 * area(&light));
    }

    #[test]
    fn marker_is_a_fixed_width_centerline() {
        let BrushOutput::Centerline(sub, style) = brush_output(&line(), &brush(BrushKind::Marker), "n")
        else {
            panic!("expected centerline");
        };
        assert!(!sub.closed);
        assert_eq!(sub.anchors.len(), 11);
        assert_eq!(style.width, 10.0);
    }

    #[test]
    fn spray_is_stable_per_node() {
        let b = brush(BrushKind::Spray);
        let a1 = brush_output(&line(), &b, "spray-1");
        let a2 = brush_output(&line(), &b, "spray-1");
        let other = brush_output(&line(), &b, "spray-2");
        assert_eq!(a1, a2);
        assert_ne!(a1, other);
        let BrushOutput::Dots(dots) = a1 else {
            panic!("expected dots");
        };
        assert_eq!(dots.len(), 11 * SPRAY_DENSITY);
        assert!(dots.iter().all(|(p, _)| p.y.abs() <= 5.0));
    }

    #[test]
    fn degenerate_input_draws_little_or_nothing() {
        assert_eq!(brush_output(&[], &brush(BrushKind::Pencil), "n"), BrushOutput::Nothing);
        let single = brush_output(&[Point::new(1.0, 1.0)], &brush(BrushKind::Pencil), "n");
        assert!(matches!(single, BrushOutput::Dots(d) if d.len() == 1));
    }
}
