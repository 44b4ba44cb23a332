//! 2D affine transforms.
//!
//! Stored as a 3x2 matrix (the bottom row [0, 0, 1] is implicit):
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0  1  |
//! ```

use std::f64::consts::PI;

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx,
            ty,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Rotation from radians (clockwise on screen, since y points down).
    pub fn rotate(angle_rad: f64) -> Self {
        if angle_rad == 0.0 {
            return Self::identity();
        }
        let cos = angle_rad.cos();
        let sin = angle_rad.sin();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn rotate_deg(angle_deg: f64) -> Self {
        Self::rotate(angle_deg * PI / 180.0)
    }

    /// Compose: the result applies `other` first, then `self`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    /// Object transform used for every non-group scene node: rotate and scale
    /// about the center of the unscaled `width`×`height` box, then move the box
    /// to `(x, y)`.
    pub fn about_center(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation_deg: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> Self {
        let cx = width * 0.5;
        let cy = height * 0.5;
        Self::translate(x + cx, y + cy)
            .then(&Self::rotate_deg(rotation_deg))
            .then(&Self::scale(scale_x, scale_y))
            .then(&Self::translate(-cx, -cy))
    }

    /// Group transform: rotate and scale about the group's own origin.
    pub fn about_origin(x: f64, y: f64, rotation_deg: f64, scale_x: f64, scale_y: f64) -> Self {
        Self::translate(x, y)
            .then(&Self::rotate_deg(rotation_deg))
            .then(&Self::scale(scale_x, scale_y))
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Returns `None` if the transform is not invertible.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() <= f64::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            tx: (self.c * self.ty - self.d * self.tx) * inv_det,
            ty: (self.b * self.tx - self.a * self.ty) * inv_det,
        })
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.a - 1.0).abs() < epsilon
            && self.b.abs() < epsilon
            && self.c.abs() < epsilon
            && (self.d - 1.0).abs() < epsilon
            && self.tx.abs() < epsilon
            && self.ty.abs() < epsilon
    }

    /// Largest axis scale factor, used to pick flattening density.
    pub fn max_scale(&self) -> f64 {
        let sx = (self.a * self.a + self.b * self.b).sqrt();
        let sy = (self.c * self.c + self.d * self.d).sqrt();
        sx.max(sy)
    }

    /// Row-major [a, b, c, d, tx, ty] as f32, the layout tiny-skia and PDF use.
    pub fn to_f32_row(&self) -> [f32; 6] {
        [
            self.a as f32,
            self.b as f32,
            self.c as f32,
            self.d as f32,
            self.tx as f32,
            self.ty as f32,
        ]
    }
}
