//! Text along a curve.
//!
//! The path is resampled at even arc-length steps; each grapheme is put at
//! the sample nearest the middle of its advance and rotated to the local
//! tangent, taken toward the next sample.

use engine_core::geometry::{self, Point};
use engine_core::path::{self, Anchor};

use crate::font::GlyphMeasure;
use crate::placement::{PlacedGlyph, TextAlign};
use crate::unicode::graphemes;

/// Fewest arc-length steps used to approximate a path.
pub const MIN_SAMPLES: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct CurveLayout {
    pub glyphs: Vec<PlacedGlyph>,
    pub path_length: f64,
    pub text_length: f64,
    pub start_offset: f64,
    /// False when the path was too short to follow and the text fell back
    /// to a horizontal run.
    pub on_path: bool,
}

/// Evenly spaced samples along an anchor path, at least [`MIN_SAMPLES`]
/// steps. Degenerate paths return what they have (possibly < 2 points).
pub fn sample_path(anchors: &[Anchor], closed: bool, steps: usize) -> Vec<Point> {
    path::sample_by_arc_length(anchors, closed, steps.max(MIN_SAMPLES))
}

pub fn layout_on_path(
    text: &str,
    measure: &dyn GlyphMeasure,
    font_size: f32,
    samples: &[Point],
    align: TextAlign,
) -> CurveLayout {
    let clusters = graphemes(text);
    let advances: Vec<f64> = clusters
        .iter()
        .map(|g| measure.advance(g, font_size) as f64)
        .collect();
    let text_length: f64 = advances.iter().sum();

    let cumulative = geometry::cumulative_lengths(samples);
    let path_length = cumulative.last().copied().unwrap_or(0.0);
    if samples.len() < 2 || path_length <= f64::EPSILON {
        let origin = samples.first().copied().unwrap_or_default();
        return horizontal(clusters, advances, origin, text_length);
    }

    let start_offset = align.offset(path_length, text_length);
    let mut glyphs = Vec::with_capacity(clusters.len());
    let mut walked = 0.0;
    let mut cursor = 0usize;
    for (g, adv) in clusters.into_iter().zip(advances) {
        let target = start_offset + walked + adv * 0.5;
        // Targets only grow, so the nearest-sample search resumes where the
        // previous glyph stopped.
        while cursor + 1 < cumulative.len()
            && (cumulative[cursor + 1] - target).abs() <= (cumulative[cursor] - target).abs()
        {
            cursor += 1;
        }
        let center = samples[cursor];
        let (from, to) = if cursor + 1 < samples.len() {
            (samples[cursor], samples[cursor + 1])
        } else {
            (samples[cursor - 1], samples[cursor])
        };
        let angle = (to.y - from.y).atan2(to.x - from.x);
        let half = adv * 0.5;
        glyphs.push(PlacedGlyph {
            text: g.to_string(),
            origin: Point::new(center.x - half * angle.cos(), center.y - half * angle.sin()),
            center,
            angle,
            advance: adv,
        });
        walked += adv;
    }

    CurveLayout {
        glyphs,
        path_length,
        text_length,
        start_offset,
        on_path: true,
    }
}

fn horizontal(
    clusters: Vec<&str>,
    advances: Vec<f64>,
    origin: Point,
    text_length: f64,
) -> CurveLayout {
    let mut x = origin.x;
    let glyphs = clusters
        .into_iter()
        .zip(advances)
        .map(|(g, adv)| {
            let glyph = PlacedGlyph {
                text: g.to_string(),
                origin: Point::new(x, origin.y),
                center: Point::new(x + adv * 0.5, origin.y),
                angle: 0.0,
                advance: adv,
            };
            x += adv;
            glyph
        })
        .collect();
    CurveLayout {
        glyphs,
        path_length: 0.0,
        text_length,
        start_offset: 0.0,
        on_path: false,
    }
}
