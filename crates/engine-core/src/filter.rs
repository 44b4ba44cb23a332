//! Pixel filters for image-like nodes.
//!
//! A [`FilterSet`] is the authored form (CSS-like percentages and flags).
//! [`FilterSet::ops`] turns it into the ordered list of operations that
//! actually change pixels, dropping neutral values. The same list drives
//! both the raster path ([`apply_rgba`]) and the SVG `<filter>` primitives
//! ([`svg_primitives`]), using identical color matrices.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    /// Percent, 100 is neutral.
    pub contrast: f32,
    /// Percent, 100 is neutral.
    pub brightness: f32,
    /// Percent, 0 is neutral.
    pub grayscale: f32,
    pub threshold: bool,
    /// Degrees, 0 is neutral.
    pub hue_rotate: f32,
    pub invert: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            contrast: 100.0,
            brightness: 100.0,
            grayscale: 0.0,
            threshold: false,
            hue_rotate: 0.0,
            invert: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    /// Multiplier, 1.0 is neutral.
    Contrast(f32),
    Brightness(f32),
    /// Amount in [0, 1].
    Grayscale(f32),
    Threshold,
    HueRotate(f32),
    Invert,
}

impl FilterSet {
    /// Operations in application order, with neutral values elided.
    pub fn ops(&self) -> Vec<FilterOp> {
        let mut ops = Vec::new();
        if self.contrast != 100.0 {
            ops.push(FilterOp::Contrast(self.contrast.max(0.0) / 100.0));
        }
        if self.brightness != 100.0 {
            ops.push(FilterOp::Brightness(self.brightness.max(0.0) / 100.0));
        }
        if self.grayscale != 0.0 {
            ops.push(FilterOp::Grayscale(self.grayscale.clamp(0.0, 100.0) / 100.0));
        }
        if self.threshold {
            ops.push(FilterOp::Threshold);
        }
        if self.hue_rotate.rem_euclid(360.0) != 0.0 {
            ops.push(FilterOp::HueRotate(self.hue_rotate));
        }
        if self.invert {
            ops.push(FilterOp::Invert);
        }
        ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops().is_empty()
    }
}

type Matrix3 = [[f32; 3]; 3];

fn grayscale_matrix(amount: f32) -> Matrix3 {
    let s = 1.0 - amount;
    [
        [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
    ]
}

/// The hue rotation matrix from the Filter Effects spec, which is also what
/// `feColorMatrix type="hueRotate"` computes.
fn hue_matrix(degrees: f32) -> Matrix3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn mul(m: &Matrix3, [r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * r + m[0][1] * g + m[0][2] * b,
        m[1][0] * r + m[1][1] * g + m[1][2] * b,
        m[2][0] * r + m[2][1] * g + m[2][2] * b,
    ]
}

fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

impl FilterOp {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match *self {
            FilterOp::Contrast(c) => rgb.map(|v| (v - 0.5) * c + 0.5),
            FilterOp::Brightness(b) => rgb.map(|v| v * b),
            FilterOp::Grayscale(g) => mul(&grayscale_matrix(g), rgb),
            FilterOp::Threshold => {
                let v = if luminance(rgb) >= 0.5 { 1.0 } else { 0.0 };
                [v; 3]
            }
            FilterOp::HueRotate(deg) => mul(&hue_matrix(deg), rgb),
            FilterOp::Invert => rgb.map(|v| 1.0 - v),
        };
        out.map(|v| v.clamp(0.0, 1.0))
    }
}

/// Apply `ops` in order to straight-alpha RGBA8 pixels. Alpha is untouched.
pub fn apply_rgba(ops: &[FilterOp], pixels: &mut [u8]) {
    if ops.is_empty() {
        return;
    }
    for px in pixels.chunks_exact_mut(4) {
        let mut rgb = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        for op in ops {
            rgb = op.apply(rgb);
        }
        for (dst, v) in px.iter_mut().zip(rgb) {
            *dst = (v * 255.0).round() as u8;
        }
    }
}

fn matrix_values(m: &Matrix3) -> String {
    let mut s = String::new();
    for row in m {
        let _ = write!(s, "{} {} {} 0 0 ", row[0], row[1], row[2]);
    }
    s.push_str("0 0 0 1 0");
    s
}

fn transfer(kind_attrs: &str) -> String {
    format!(
        "<feComponentTransfer><feFuncR {kind_attrs}/><feFuncG {kind_attrs}/><feFuncB {kind_attrs}/></feComponentTransfer>"
    )
}

/// SVG filter primitives equivalent to `ops`, in order, for embedding in a
/// `<filter color-interpolation-filters="sRGB">` element.
pub fn svg_primitives(ops: &[FilterOp]) -> String {
    let mut out = String::new();
    for op in ops {
        match *op {
            FilterOp::Contrast(c) => out.push_str(&transfer(&format!(
                r#"type="linear" slope="{c}" intercept="{}""#,
                0.5 - 0.5 * c
            ))),
            FilterOp::Brightness(b) => {
                out.push_str(&transfer(&format!(r#"type="linear" slope="{b}""#)))
            }
            FilterOp::Grayscale(g) => {
                let _ = write!(
                    out,
                    r#"<feColorMatrix type="matrix" values="{}"/>"#,
                    matrix_values(&grayscale_matrix(g))
                );
            }
            FilterOp::Threshold => {
                let lum = [0.2126f32, 0.7152, 0.0722];
                let _ = write!(
                    out,
                    r#"<feColorMatrix type="matrix" values="{}"/>"#,
                    matrix_values(&[lum, lum, lum])
                );
                out.push_str(&transfer(r#"type="discrete" tableValues="0 1""#));
            }
            FilterOp::HueRotate(deg) => {
                let _ = write!(out, r#"<feColorMatrix type="hueRotate" values="{deg}"/>"#);
            }
            FilterOp::Invert => out.push_str(&transfer(r#"type="table" tableValues="1 0""#)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_values_are_elided() {
        assert!(FilterSet::default().ops().is_empty());
        let set = FilterSet {
            hue_rotate: 360.0,
            ..FilterSet::default()
        };
        assert!(set.is_identity());
    }

    #[test]
    fn ops_keep_fixed_order() {
        let set = FilterSet {
            invert: true,
            hue_rotate: 90.0,
            threshold: true,
            grayscale: 50.0,
            brightness: 120.0,
            contrast: 80.0,
        };
        let ops = set.ops();
        assert_eq!(
            ops,
            vec![
                FilterOp::Contrast(0.8),
                FilterOp::Brightness(1.2),
                FilterOp::Grayscale(0.5),
                FilterOp::Threshold,
                FilterOp::HueRotate(90.0),
                FilterOp::Invert,
            ]
        );
    }

    #[test]
    fn invert_and_grayscale_pixels() {
        let mut px = [255, 0, 0, 200];
        apply_rgba(&[FilterOp::Invert], &mut px);
        assert_eq!(px, [0, 255, 255, 200]);

        let mut px = [255, 0, 0, 255];
        apply_rgba(&[FilterOp::Grayscale(1.0)], &mut px);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[0], 54);
    }

    #[test]
    fn threshold_splits_on_luminance() {
        let mut px = [200, 200, 200, 255, 40, 40, 40, 255];
        apply_rgba(&[FilterOp::Threshold], &mut px);
        assert_eq!(px, [255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn hue_rotate_full_turn_is_identity() {
        let m = hue_matrix(360.0);
        let out = mul(&m, [0.2, 0.5, 0.9]);
        for (a, b) in out.iter().zip([0.2, 0.5, 0.9]) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn svg_primitives_follow_op_order() {
        let svg = svg_primitives(&[FilterOp::Brightness(1.5), FilterOp::Invert]);
        let b = svg.find("slope=\"1.5\"").unwrap();
        let i = svg.find("tableValues=\"1 0\"").unwrap();
        assert!(b < i);
    }
}
