//! Paint descriptions handed to the rendering backends.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::Point;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Stops with offsets clamped to [0, 1] and forced non-decreasing.
pub fn sanitize_stops(stops: &[GradientStop]) -> Vec<GradientStop> {
    let mut last = 0.0f32;
    stops
        .iter()
        .map(|s| {
            let offset = s.offset.clamp(0.0, 1.0).max(last);
            last = offset;
            GradientStop { offset, ..*s }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Color),
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
    },
    RadialGradient {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
}

impl Paint {
    pub fn stops(&self) -> &[GradientStop] {
        match self {
            Paint::Solid(_) => &[],
            Paint::LinearGradient { stops, .. } | Paint::RadialGradient { stops, .. } => stops,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// CSS `mix-blend-mode` keyword.
    pub fn css_name(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Hue => "hue",
            BlendMode::Saturation => "saturation",
            BlendMode::Color => "color",
            BlendMode::Luminosity => "luminosity",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub color: Color,
    pub cap: LineCap,
    pub dash: Vec<f64>,
}

impl StrokeStyle {
    pub fn solid(width: f64, color: Color) -> Self {
        Self {
            width,
            color,
            cap: LineCap::Round,
            dash: Vec::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.color.a > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_become_monotonic() {
        let stops = [
            GradientStop { offset: 0.6, color: Color::BLACK },
            GradientStop { offset: 0.2, color: Color::WHITE },
            GradientStop { offset: 1.4, color: Color::BLACK },
        ];
        let out: Vec<f32> = sanitize_stops(&stops).iter().map(|s| s.offset).collect();
        assert_eq!(out, vec![0.6, 0.6, 1.0]);
    }

    #[test]
    fn blend_names_match_css() {
        let b: BlendMode = serde_json::from_str("\"color-dodge\"").unwrap();
        assert_eq!(b.css_name(), "color-dodge");
    }
}
