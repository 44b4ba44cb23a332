//! Primitive shapes as anchor paths.
//!
//! Every shape is built inside its own unscaled `width`×`height` box with the
//! origin at the top-left corner, then [`place`] bakes rotation, scale and
//! position into the coordinates so the result is plain geometry (suitable
//! for boolean operations).

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

use crate::path::Anchor;
use crate::transform::Transform2D;

/// Cubic bezier circle constant, (4/3)(√2 − 1).
pub const KAPPA: f64 = 4.0 / 3.0 * (SQRT_2 - 1.0);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShapeKind {
    Rect {
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse,
    Star {
        #[serde(default = "default_star_points")]
        points: u32,
        #[serde(default = "default_inner_ratio")]
        inner_ratio: f64,
    },
    Polygon {
        #[serde(default = "default_sides")]
        sides: u32,
    },
    Triangle,
}

fn default_star_points() -> u32 {
    5
}

fn default_inner_ratio() -> f64 {
    0.5
}

fn default_sides() -> u32 {
    6
}

impl Default for ShapeKind {
    fn default() -> Self {
        ShapeKind::Rect { corner_radius: 0.0 }
    }
}

impl ShapeKind {
    /// Closed anchor path of the shape in its local box.
    pub fn anchors(&self, width: f64, height: f64) -> Vec<Anchor> {
        match *self {
            ShapeKind::Rect { corner_radius } => rect(width, height, corner_radius),
            ShapeKind::Ellipse => ellipse(width, height),
            ShapeKind::Star {
                points,
                inner_ratio,
            } => star(width, height, points, inner_ratio),
            ShapeKind::Polygon { sides } => polygon(width, height, sides),
            ShapeKind::Triangle => polygon(width, height, 3),
        }
    }
}

pub fn rect(width: f64, height: f64, corner_radius: f64) -> Vec<Anchor> {
    let r = corner_radius.min(width * 0.5).min(height * 0.5);
    if !(r > 0.0) {
        return vec![
            Anchor::new(0.0, 0.0),
            Anchor::new(width, 0.0),
            Anchor::new(width, height),
            Anchor::new(0.0, height),
        ];
    }
    let k = KAPPA * r;
    let (w, h) = (width, height);
    let p = crate::geometry::Point::new;
    vec![
        Anchor::with_controls(r, 0.0, Some(p(r - k, 0.0)), None),
        Anchor::with_controls(w - r, 0.0, None, Some(p(w - r + k, 0.0))),
        Anchor::with_controls(w, r, Some(p(w, r - k)), None),
        Anchor::with_controls(w, h - r, None, Some(p(w, h - r + k))),
        Anchor::with_controls(w - r, h, Some(p(w - r + k, h)), None),
        Anchor::with_controls(r, h, None, Some(p(r - k, h))),
        Anchor::with_controls(0.0, h - r, Some(p(0.0, h - r + k)), None),
        Anchor::with_controls(0.0, r, None, Some(p(0.0, r - k))),
    ]
}

/// Four cubic arcs, clockwise on screen from the top.
pub fn ellipse(width: f64, height: f64) -> Vec<Anchor> {
    let (cx, cy) = (width * 0.5, height * 0.5);
    let (kx, ky) = (KAPPA * cx, KAPPA * cy);
    let p = crate::geometry::Point::new;
    vec![
        Anchor::with_controls(cx, 0.0, Some(p(cx - kx, 0.0)), Some(p(cx + kx, 0.0))),
        Anchor::with_controls(width, cy, Some(p(width, cy - ky)), Some(p(width, cy + ky))),
        Anchor::with_controls(cx, height, Some(p(cx + kx, height)), Some(p(cx - kx, height))),
        Anchor::with_controls(0.0, cy, Some(p(0.0, cy + ky)), Some(p(0.0, cy - ky))),
    ]
}

/// Alternating outer/inner vertices, 2N anchors, first point straight up.
pub fn star(width: f64, height: f64, points: u32, inner_ratio: f64) -> Vec<Anchor> {
    let n = points.max(3) as usize;
    let ratio = inner_ratio.clamp(0.0, 1.0);
    let (cx, cy) = (width * 0.5, height * 0.5);
    let step = PI / n as f64;
    (0..2 * n)
        .map(|i| {
            let angle = -PI / 2.0 + step * i as f64;
            let s = if i % 2 == 0 { 1.0 } else { ratio };
            Anchor::new(cx + cx * s * angle.cos(), cy + cy * s * angle.sin())
        })
        .collect()
}

/// Regular polygon inscribed in the box ellipse, first vertex straight up.
pub fn polygon(width: f64, height: f64, sides: u32) -> Vec<Anchor> {
    let n = sides.max(3) as usize;
    let (cx, cy) = (width * 0.5, height * 0.5);
    let step = 2.0 * PI / n as f64;
    (0..n)
        .map(|i| {
            let angle = -PI / 2.0 + step * i as f64;
            Anchor::new(cx + cx * angle.cos(), cy + cy * angle.sin())
        })
        .collect()
}

/// Placement of a local-box shape in scene space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Placement {
    pub fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn transform(&self) -> Transform2D {
        Transform2D::about_center(
            self.x,
            self.y,
            self.width,
            self.height,
            self.rotation,
            self.scale_x,
            self.scale_y,
        )
    }
}

/// Rewrite every anchor and control point through the placement transform.
pub fn place(anchors: &[Anchor], placement: &Placement) -> Vec<Anchor> {
    crate::path::transform_anchors(anchors, &placement.transform())
}
