//! rune-surface: drawing backends for rendered scenes.
//!
//! [`Canvas`] rasterizes with tiny-skia; [`SvgDocument`] records the same
//! calls as SVG markup. Both implement [`Surface`], so the scene renderer
//! never knows which one it drives.

mod canvas;
pub mod encode;
mod error;
mod source;
mod surface;
mod vector;

pub use canvas::{Canvas, RasterImage, rect_subpath};
pub use encode::{PdfOptions, encode_jpeg, encode_pdf, encode_png};
pub use error::{Result, SurfaceError};
pub use source::ImageSource;
pub use surface::{GlyphRun, Layer, LayerStack, LayerState, Surface};
pub use vector::{SvgDocument, escape_xml};
