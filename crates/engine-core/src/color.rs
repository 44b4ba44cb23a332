use std::fmt;

use palette::{FromColor, LinSrgba, Srgba};
use serde::{Deserialize, Serialize};

/// Straight-alpha sRGB color as authored in scene documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Visible stand-in for resources that failed to load.
    pub const PLACEHOLDER: Color = Color::rgba(204, 204, 204, 255);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse any CSS color string (`#rgb`, `#rrggbbaa`, `rgb()`, names, ...).
    pub fn parse(s: &str) -> Result<Self, ColorParseError> {
        let c = csscolorparser::parse(s.trim()).map_err(|_| ColorParseError(s.to_string()))?;
        let [r, g, b, a] = c.to_rgba8();
        Ok(Self { r, g, b, a })
    }

    pub fn alpha_f32(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Multiply alpha by `opacity` in [0, 1].
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// `#rrggbb` without alpha, as SVG `fill`/`stop-color` expect.
    pub fn to_hex_rgb(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Interpolate in linear light so blends between saturated colors do not
    /// go muddy.
    pub fn mix(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let a = self.to_linear();
        let b = other.to_linear();
        let lerp = |x: f32, y: f32| x + (y - x) * t;
        Color::from_linear(LinSrgba::new(
            lerp(a.red, b.red),
            lerp(a.green, b.green),
            lerp(a.blue, b.blue),
            lerp(a.alpha, b.alpha),
        ))
    }

    fn to_linear(self) -> LinSrgba {
        let s = Srgba::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        );
        LinSrgba::from_color(s)
    }

    fn from_linear(lin: LinSrgba) -> Color {
        let srgb: Srgba = Srgba::from_color(lin);
        Color {
            r: (srgb.red * 255.0).round().clamp(0.0, 255.0) as u8,
            g: (srgb.green * 255.0).round().clamp(0.0, 255.0) as u8,
            b: (srgb.blue * 255.0).round().clamp(0.0, 255.0) as u8,
            a: (srgb.alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex_rgb())
        } else {
            write!(f, "{}{:02x}", self.to_hex_rgb(), self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized color: {0:?}")]
pub struct ColorParseError(pub String);
