//! Advance-width measurement behind a trait, so layout works with a real
//! font, with approximate metrics when no font could be loaded, and with
//! fixed advances in tests.

use crate::font::FontFace;

pub trait GlyphMeasure {
    /// Advance of one grapheme cluster at `font_size` pixels per em.
    fn advance(&self, grapheme: &str, font_size: f32) -> f32;

    /// Distance from the top of a line box to its baseline.
    fn ascent(&self, font_size: f32) -> f32 {
        font_size * 0.8
    }

    fn line_height(&self, font_size: f32) -> f32 {
        font_size * 1.2
    }
}

impl GlyphMeasure for FontFace {
    fn advance(&self, grapheme: &str, font_size: f32) -> f32 {
        FontFace::advance(self, grapheme, font_size)
    }

    fn ascent(&self, font_size: f32) -> f32 {
        self.scaled_metrics(font_size).ascent
    }

    fn line_height(&self, font_size: f32) -> f32 {
        let h = self.scaled_metrics(font_size).line_height();
        if h > 0.0 { h } else { font_size * 1.2 }
    }
}

/// Average-width estimate used when the requested font is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMetrics;

impl GlyphMeasure for ApproxMetrics {
    fn advance(&self, grapheme: &str, font_size: f32) -> f32 {
        if grapheme.chars().all(char::is_whitespace) {
            font_size * 0.3
        } else {
            font_size * 0.55
        }
    }
}

/// Every grapheme has the same advance regardless of size.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance(pub f32);

impl GlyphMeasure for FixedAdvance {
    fn advance(&self, _grapheme: &str, _font_size: f32) -> f32 {
        self.0
    }
}
