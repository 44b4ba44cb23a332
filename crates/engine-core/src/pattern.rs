//! Procedural fill patterns.
//!
//! A pattern is expanded into a [`PatternFill`]: a background color plus a
//! list of simple primitives covering a `width`×`height` area. Backends clip
//! the fill to the shape they are painting. `noise`, `speed-lines` and
//! `tie-dye` draw from a [`RandomSource`]; every other kind is a pure
//! function of its inputs.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::{Point, Rect};
use crate::random::RandomSource;

/// Upper bound on generated primitives so huge canvases stay bounded.
const MAX_PRIMS: usize = 40_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    Checkerboard,
    DiagonalStripes,
    Halftone,
    SpeedLines,
    Crosshatch,
    Noise,
    TieDye,
    Hexagons,
}

impl PatternKind {
    pub fn is_randomized(self) -> bool {
        matches!(
            self,
            PatternKind::Noise | PatternKind::SpeedLines | PatternKind::TieDye
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub primary: Color,
    #[serde(default = "default_secondary")]
    pub secondary: Color,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_secondary() -> Color {
    Color::WHITE
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatternPrim {
    Rect { rect: Rect, color: Color },
    Circle { center: Point, radius: f64, color: Color },
    Line { from: Point, to: Point, width: f64, color: Color },
    Polygon { points: Vec<Point>, color: Color },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternFill {
    pub width: f64,
    pub height: f64,
    pub background: Color,
    pub prims: Vec<PatternPrim>,
}

/// Expand `spec` over a `width`×`height` area.
pub fn generate(
    spec: &PatternSpec,
    width: f64,
    height: f64,
    rng: &mut dyn RandomSource,
) -> PatternFill {
    let scale = if spec.scale.is_finite() && spec.scale > 0.0 {
        spec.scale
    } else {
        1.0
    };
    let mut g = Gen {
        w: width.max(0.0),
        h: height.max(0.0),
        scale,
        primary: spec.primary,
        secondary: spec.secondary,
        prims: Vec::new(),
    };
    match spec.kind {
        PatternKind::Checkerboard => g.checkerboard(),
        PatternKind::DiagonalStripes => g.diagonal_stripes(),
        PatternKind::Halftone => g.halftone(),
        PatternKind::SpeedLines => g.speed_lines(rng),
        PatternKind::Crosshatch => g.crosshatch(),
        PatternKind::Noise => g.noise(rng),
        PatternKind::TieDye => g.tie_dye(rng),
        PatternKind::Hexagons => g.hexagons(),
    }
    PatternFill {
        width: g.w,
        height: g.h,
        background: spec.secondary,
        prims: g.prims,
    }
}

/// Steps of `step` needed to cover `extent`, capped at the primitive budget
/// so huge or infinite extents stay small integers.
fn cell_count(extent: f64, step: f64) -> usize {
    ((extent / step).ceil() as usize).min(MAX_PRIMS)
}

struct Gen {
    w: f64,
    h: f64,
    scale: f64,
    primary: Color,
    secondary: Color,
    prims: Vec<PatternPrim>,
}

impl Gen {
    fn push(&mut self, prim: PatternPrim) -> bool {
        if self.prims.len() >= MAX_PRIMS {
            return false;
        }
        self.prims.push(prim);
        true
    }

    fn checkerboard(&mut self) {
        let cell = 10.0 * self.scale;
        let cols = cell_count(self.w, cell);
        let rows = cell_count(self.h, cell);
        for row in 0..rows {
            for col in (row % 2..cols).step_by(2) {
                let rect = Rect::new(col as f64 * cell, row as f64 * cell, cell, cell);
                if !self.push(PatternPrim::Rect {
                    rect,
                    color: self.primary,
                }) {
                    return;
                }
            }
        }
    }

    /// Parallel 45° lines `spacing` apart covering the area.
    fn diagonals(&mut self, spacing: f64, width: f64, rising: bool) {
        let mut offset = -self.h;
        while offset <= self.w + spacing {
            let (from, to) = if rising {
                (Point::new(offset, self.h), Point::new(offset + self.h, 0.0))
            } else {
                (Point::new(offset, 0.0), Point::new(offset + self.h, self.h))
            };
            if !self.push(PatternPrim::Line {
                from,
                to,
                width,
                color: self.primary,
            }) {
                return;
            }
            offset += spacing;
        }
    }

    fn diagonal_stripes(&mut self) {
        let spacing = 12.0 * self.scale;
        self.diagonals(spacing, spacing * 0.5, true);
    }

    fn crosshatch(&mut self) {
        let spacing = 8.0 * self.scale;
        let width = self.scale;
        self.diagonals(spacing, width, true);
        self.diagonals(spacing, width, false);
    }

    /// Dot grid whose radius grows from the top-left to the bottom-right.
    fn halftone(&mut self) {
        let spacing = 8.0 * self.scale;
        let max_r = spacing * 0.5;
        let span = (self.w + self.h).max(f64::EPSILON);
        let cols = cell_count(self.w, spacing) + 1;
        let rows = cell_count(self.h, spacing) + 1;
        for row in 0..rows {
            // Odd rows shift half a cell for the classic offset screen.
            let shift = if row % 2 == 1 { spacing * 0.5 } else { 0.0 };
            for col in 0..cols {
                let center = Point::new(col as f64 * spacing + shift, row as f64 * spacing);
                let radius = max_r * ((center.x + center.y) / span).clamp(0.1, 1.0);
                if !self.push(PatternPrim::Circle {
                    center,
                    radius,
                    color: self.primary,
                }) {
                    return;
                }
            }
        }
    }

    /// Thin wedges radiating from the center to beyond the corners.
    fn speed_lines(&mut self, rng: &mut dyn RandomSource) {
        let center = Point::new(self.w * 0.5, self.h * 0.5);
        let reach = (self.w * self.w + self.h * self.h).sqrt();
        let inner = reach * 0.18;
        let count = 48;
        for i in 0..count {
            let base = 2.0 * PI * i as f64 / count as f64;
            let angle = base + rng.range(-0.04, 0.04);
            let half = rng.range(0.004, 0.02);
            let start = inner * rng.range(0.8, 1.4);
            let tip = Point::new(
                center.x + start * angle.cos(),
                center.y + start * angle.sin(),
            );
            let a = Point::new(
                center.x + reach * (angle - half).cos(),
                center.y + reach * (angle - half).sin(),
            );
            let b = Point::new(
                center.x + reach * (angle + half).cos(),
                center.y + reach * (angle + half).sin(),
            );
            self.push(PatternPrim::Polygon {
                points: vec![tip, a, b],
                color: self.primary,
            });
        }
    }

    fn noise(&mut self, rng: &mut dyn RandomSource) {
        let grain = 1.5 * self.scale;
        let count = ((self.w * self.h) / (16.0 * self.scale * self.scale)) as usize;
        for _ in 0..count.min(MAX_PRIMS) {
            let x = rng.range(0.0, self.w.max(grain));
            let y = rng.range(0.0, self.h.max(grain));
            let alpha = rng.range(0.25, 1.0) as f32;
            self.push(PatternPrim::Rect {
                rect: Rect::new(x, y, grain, grain),
                color: self.primary.with_opacity(alpha),
            });
        }
    }

    /// Wobbly concentric rings, largest first, alternating between the
    /// primary color and a primary/secondary blend.
    fn tie_dye(&mut self, rng: &mut dyn RandomSource) {
        let center = Point::new(self.w * 0.5, self.h * 0.5);
        let reach = 0.5 * (self.w * self.w + self.h * self.h).sqrt();
        let band = 14.0 * self.scale;
        let rings = cell_count(reach, band).max(1);
        let blend = self.primary.mix(self.secondary, 0.5);
        let twist = rng.range(0.0, 2.0 * PI);
        for k in (1..=rings).rev() {
            let radius = band * k as f64;
            let wobble = band * 0.35;
            let phase = twist + rng.range(0.0, PI);
            let lobes = 5.0 + (k % 3) as f64;
            let points = (0..64)
                .map(|i| {
                    let t = 2.0 * PI * i as f64 / 64.0;
                    let r = radius + wobble * (lobes * t + phase).sin();
                    Point::new(center.x + r * t.cos(), center.y + r * t.sin())
                })
                .collect();
            let color = if k % 2 == 0 { self.primary } else { blend };
            if !self.push(PatternPrim::Polygon { points, color }) {
                return;
            }
        }
    }

    /// Pointy-top hexagon grid, each cell inset so the background shows
    /// through as the grid line.
    fn hexagons(&mut self) {
        let r = 10.0 * self.scale;
        let inset = r * 0.88;
        let dx = 3f64.sqrt() * r;
        let dy = 1.5 * r;
        let cols = cell_count(self.w, dx) + 2;
        let rows = cell_count(self.h, dy) + 2;
        for row in 0..rows {
            let shift = if row % 2 == 1 { dx * 0.5 } else { 0.0 };
            for col in 0..cols {
                let c = Point::new(col as f64 * dx + shift, row as f64 * dy);
                let points = (0..6)
                    .map(|i| {
                        let a = -PI / 2.0 + PI / 3.0 * i as f64;
                        Point::new(c.x + inset * a.cos(), c.y + inset * a.sin())
                    })
                    .collect();
                if !self.push(PatternPrim::Polygon {
                    points,
                    color: self.primary,
                }) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::XorShift;

    fn spec(kind: PatternKind) -> PatternSpec {
        PatternSpec {
            kind,
            primary: Color::rgb(200, 30, 60),
            secondary: Color::WHITE,
            scale: 1.0,
        }
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let fill = generate(&spec(PatternKind::Checkerboard), 40.0, 20.0, &mut XorShift::default());
        assert_eq!(fill.background, Color::WHITE);
        // 4x2 cells, half painted.
        assert_eq!(fill.prims.len(), 4);
        let PatternPrim::Rect { rect, .. } = &fill.prims[0] else {
            panic!("expected rect");
        };
        assert_eq!((rect.x, rect.y, rect.w), (0.0, 0.0, 10.0));
    }

    #[test]
    fn deterministic_kinds_ignore_rng() {
        for kind in [
            PatternKind::Checkerboard,
            PatternKind::DiagonalStripes,
            PatternKind::Halftone,
            PatternKind::Crosshatch,
            PatternKind::Hexagons,
        ] {
            let a = generate(&spec(kind), 64.0, 48.0, &mut XorShift::seeded(1));
            let b = generate(&spec(kind), 64.0, 48.0, &mut XorShift::seeded(99));
            assert_eq!(a, b, "{kind:?}");
            assert!(!a.prims.is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn randomized_kinds_follow_seed() {
        for kind in [PatternKind::Noise, PatternKind::SpeedLines, PatternKind::TieDye] {
            assert!(kind.is_randomized());
            let a = generate(&spec(kind), 64.0, 48.0, &mut XorShift::seeded(7));
            let b = generate(&spec(kind), 64.0, 48.0, &mut XorShift::seeded(7));
            let c = generate(&spec(kind), 64.0, 48.0, &mut XorShift::seeded(8));
            assert_eq!(a, b, "{kind:?}");
            assert_ne!(a, c, "{kind:?}");
        }
    }

    #[test]
    fn scale_changes_density() {
        let fine = generate(&spec(PatternKind::Halftone), 100.0, 100.0, &mut XorShift::default());
        let mut coarse_spec = spec(PatternKind::Halftone);
        coarse_spec.scale = 2.0;
        let coarse = generate(&coarse_spec, 100.0, 100.0, &mut XorShift::default());
        assert!(coarse.prims.len() < fine.prims.len());
    }

    #[test]
    fn huge_areas_stay_within_budget() {
        let kinds = [
            PatternKind::Checkerboard,
            PatternKind::DiagonalStripes,
            PatternKind::Halftone,
            PatternKind::SpeedLines,
            PatternKind::Crosshatch,
            PatternKind::Noise,
            PatternKind::TieDye,
            PatternKind::Hexagons,
        ];
        for kind in kinds {
            for width in [f64::MAX, f64::INFINITY] {
                let fill = generate(&spec(kind), width, 10.0, &mut XorShift::seeded(9));
                assert!(fill.prims.len() <= MAX_PRIMS, "{kind:?}");
            }
        }
    }

    #[test]
    fn zero_area_is_harmless() {
        let fill = generate(&spec(PatternKind::Noise), 0.0, 0.0, &mut XorShift::default());
        assert!(fill.prims.is_empty());
    }
}
