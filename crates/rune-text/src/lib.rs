//! rune-text: font faces, grapheme segmentation and glyph placement,
//! including text laid along curves.

pub mod curve;
pub mod font;
pub mod placement;
pub mod unicode;
pub mod warp;

pub use curve::{CurveLayout, MIN_SAMPLES, layout_on_path, sample_path};
pub use font::{
    ApproxMetrics, FixedAdvance, FontError, FontFace, FontLibrary, FontMetrics, GlyphMeasure,
    OutlineCommand, ScaledFontMetrics,
};
pub use placement::{PlacedGlyph, TextAlign, layout_lines};
pub use warp::WarpSpec;
