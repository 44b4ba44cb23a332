pub mod face;
pub mod loader;
pub mod measure;
pub mod metrics;

pub use face::{FontFace, OutlineCommand};
pub use loader::FontLibrary;
pub use measure::{ApproxMetrics, FixedAdvance, GlyphMeasure};
pub use metrics::{FontMetrics, ScaledFontMetrics};

/// Errors that can occur while working with fonts.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font data")]
    InvalidFont,
    #[error("no font found for family {0:?}")]
    NotFound(String),
}

/// Convenient result alias for font-related operations.
pub type Result<T> = std::result::Result<T, FontError>;
