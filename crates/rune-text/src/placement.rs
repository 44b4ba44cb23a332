//! Placed glyphs and ordinary horizontal line layout.

use engine_core::Point;
use serde::{Deserialize, Serialize};

use crate::font::GlyphMeasure;
use crate::unicode::graphemes;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Offset that aligns `content` inside `available`, never negative.
    pub fn offset(self, available: f64, content: f64) -> f64 {
        let slack = available - content;
        let off = match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => slack * 0.5,
            TextAlign::Right => slack,
        };
        off.max(0.0)
    }
}

/// One grapheme positioned for drawing.
///
/// `origin` is the pen position on the baseline; the glyph is drawn there
/// rotated by `angle` (radians, clockwise in y-down space). `center` is the
/// point the layout aimed the middle of the advance at.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub text: String,
    pub origin: Point,
    pub center: Point,
    pub angle: f64,
    pub advance: f64,
}

impl PlacedGlyph {
    pub fn angle_deg(&self) -> f64 {
        self.angle.to_degrees()
    }

    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Lay `text` out in horizontal lines inside a box of width `box_width`,
/// first baseline at the font ascent. Explicit newlines break lines; there
/// is no automatic wrapping.
pub fn layout_lines(
    text: &str,
    measure: &dyn GlyphMeasure,
    font_size: f32,
    box_width: f64,
    align: TextAlign,
) -> Vec<PlacedGlyph> {
    let ascent = measure.ascent(font_size) as f64;
    let line_height = measure.line_height(font_size) as f64;
    let mut out = Vec::new();
    for (row, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let baseline = ascent + row as f64 * line_height;
        let clusters = graphemes(line);
        let advances: Vec<f64> = clusters
            .iter()
            .map(|g| measure.advance(g, font_size) as f64)
            .collect();
        let width: f64 = advances.iter().sum();
        let mut x = align.offset(box_width, width);
        for (g, adv) in clusters.into_iter().zip(advances) {
            out.push(PlacedGlyph {
                text: g.to_string(),
                origin: Point::new(x, baseline),
                center: Point::new(x + adv * 0.5, baseline),
                angle: 0.0,
                advance: adv,
            });
            x += adv;
        }
    }
    out
}
