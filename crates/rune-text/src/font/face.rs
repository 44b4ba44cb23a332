use std::sync::Arc;

use engine_core::Point;
use swash::scale::ScaleContext;
use swash::zeno::{Command, PathData};
use swash::{FontRef, GlyphId, Metrics};

use crate::font::{FontError, FontMetrics, Result, ScaledFontMetrics};

/// Loaded font face backed by font file bytes (TTF/OTF).
///
/// A thin wrapper around `swash::FontRef` that owns the underlying data and
/// exposes metrics, advances and glyph outlines.
#[derive(Debug, Clone)]
pub struct FontFace {
    data: Arc<[u8]>,
    /// Offset to the table directory for this font.
    offset: u32,
    key: swash::CacheKey,
    metrics: FontMetrics,
}

/// One glyph outline command in pixel space, y pointing down, origin on the
/// baseline at the glyph's pen position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CurveTo(Point, Point, Point),
    Close,
}

impl FontFace {
    /// Create a font face from raw bytes and a font index within the file.
    pub fn from_bytes(data: Arc<[u8]>, index: usize) -> Result<Self> {
        let font = FontRef::from_index(&data, index).ok_or(FontError::InvalidFont)?;
        let metrics = Self::metrics_from_swash(&font);
        let (offset, key) = (font.offset, font.key);
        Ok(Self {
            data,
            offset,
            key,
            metrics,
        })
    }

    pub fn from_vec(data: Vec<u8>, index: usize) -> Result<Self> {
        Self::from_bytes(Arc::from(data), index)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>, index: usize) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_vec(data, index)
    }

    /// Raw font bytes, for embedding in documents.
    pub fn as_bytes(&self) -> Arc<[u8]> {
        self.data.clone()
    }

    fn as_swash_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    fn metrics_from_swash(font: &FontRef<'_>) -> FontMetrics {
        let Metrics {
            units_per_em,
            ascent,
            descent,
            leading,
            ..
        } = font.metrics(&[]);

        FontMetrics {
            ascent,
            descent,
            line_gap: leading,
            units_per_em,
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn scaled_metrics(&self, font_size: f32) -> ScaledFontMetrics {
        self.metrics.scale_to_pixels(font_size)
    }

    /// Glyph for the first scalar of `text`; 0 (notdef) when unmapped.
    pub fn glyph_id(&self, text: &str) -> GlyphId {
        text.chars()
            .next()
            .map_or(0, |ch| self.as_swash_ref().charmap().map(ch))
    }

    /// Horizontal advance of a grapheme in pixels. Every scalar in the
    /// cluster contributes; combining marks usually have zero advance.
    pub fn advance(&self, text: &str, font_size: f32) -> f32 {
        let font = self.as_swash_ref();
        let charmap = font.charmap();
        let glyph_metrics = font.glyph_metrics(&[]);
        let scale = self.metrics.unit_scale(font_size);
        text.chars()
            .map(|ch| glyph_metrics.advance_width(charmap.map(ch)) * scale)
            .sum()
    }

    /// Outline of a grapheme's base glyph scaled to `font_size`, flipped into
    /// y-down space. `None` for glyphs without an outline (spaces).
    pub fn glyph_outline(&self, text: &str, font_size: f32) -> Option<Vec<OutlineCommand>> {
        let glyph_id = self.glyph_id(text);
        let mut context = ScaleContext::new();
        let font = self.as_swash_ref();
        let mut scaler = context.builder(font).size(font_size).build();
        let outline = scaler.scale_outline(glyph_id)?;
        let flip = |v: swash::zeno::Vector| Point::new(v.x as f64, -(v.y as f64));
        let commands: Vec<OutlineCommand> = outline
            .path()
            .commands()
            .map(|cmd| match cmd {
                Command::MoveTo(p) => OutlineCommand::MoveTo(flip(p)),
                Command::LineTo(p) => OutlineCommand::LineTo(flip(p)),
                Command::QuadTo(c, p) => OutlineCommand::QuadTo(flip(c), flip(p)),
                Command::CurveTo(c1, c2, p) => OutlineCommand::CurveTo(flip(c1), flip(c2), flip(p)),
                Command::Close => OutlineCommand::Close,
            })
            .collect();
        (!commands.is_empty()).then_some(commands)
    }
}
