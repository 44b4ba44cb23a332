//! Decoded image resources.
//!
//! Raster formats are decoded once with `image`; SVG documents are kept as
//! a parsed `usvg` tree and rasterized at whatever resolution a draw needs.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;

use crate::error::{Result, SurfaceError};

#[derive(Clone)]
pub enum ImageSource {
    Raster {
        pixels: Arc<RgbaImage>,
        encoded: Arc<[u8]>,
        mime: &'static str,
    },
    Svg {
        tree: Arc<usvg::Tree>,
        encoded: Arc<[u8]>,
    },
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.natural_size();
        f.debug_struct("ImageSource")
            .field("mime", &self.mime())
            .field("width", &w)
            .field("height", &h)
            .finish()
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg"))
}

impl ImageSource {
    /// Sniff and decode image bytes (PNG, JPEG, GIF, WebP or SVG).
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        if looks_like_svg(&bytes) {
            let tree = usvg::Tree::from_data(&bytes, &usvg::Options::default())
                .map_err(|e| SurfaceError::Decode(e.to_string()))?;
            return Ok(ImageSource::Svg {
                tree: Arc::new(tree),
                encoded: Arc::from(bytes),
            });
        }
        let format =
            image::guess_format(&bytes).map_err(|e| SurfaceError::Decode(e.to_string()))?;
        let mime = match format {
            image::ImageFormat::Jpeg => "image/jpeg",
            image::ImageFormat::Gif => "image/gif",
            image::ImageFormat::WebP => "image/webp",
            _ => "image/png",
        };
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| SurfaceError::Decode(e.to_string()))?;
        Ok(ImageSource::Raster {
            pixels: Arc::new(decoded.to_rgba8()),
            encoded: Arc::from(bytes),
            mime,
        })
    }

    /// Wrap already decoded pixels; they are re-encoded as PNG for documents.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let mut png = Vec::new();
        pixels.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
        Ok(ImageSource::Raster {
            pixels: Arc::new(pixels),
            encoded: Arc::from(png),
            mime: "image/png",
        })
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageSource::Raster { mime, .. } => mime,
            ImageSource::Svg { .. } => "image/svg+xml",
        }
    }

    pub fn natural_size(&self) -> (f64, f64) {
        match self {
            ImageSource::Raster { pixels, .. } => (pixels.width() as f64, pixels.height() as f64),
            ImageSource::Svg { tree, .. } => {
                let size = tree.size();
                (size.width() as f64, size.height() as f64)
            }
        }
    }

    /// `data:` URI of the original bytes.
    pub fn data_uri(&self) -> String {
        let bytes = match self {
            ImageSource::Raster { encoded, .. } | ImageSource::Svg { encoded, .. } => encoded,
        };
        format!("data:{};base64,{}", self.mime(), STANDARD.encode(bytes))
    }

    /// Straight-alpha pixels at `width`×`height`. Raster sources ignore the
    /// requested size (the backend scales them); SVG renders at that size.
    pub fn pixels(&self, width: u32, height: u32) -> Option<RgbaImage> {
        match self {
            ImageSource::Raster { pixels, .. } => Some(pixels.as_ref().clone()),
            ImageSource::Svg { tree, .. } => {
                let (w, h) = (width.max(1), height.max(1));
                let mut pixmap = tiny_skia::Pixmap::new(w, h)?;
                let size = tree.size();
                let ts = tiny_skia::Transform::from_scale(
                    w as f32 / size.width().max(f32::EPSILON),
                    h as f32 / size.height().max(f32::EPSILON),
                );
                resvg::render(tree, ts, &mut pixmap.as_mut());
                let mut out = RgbaImage::new(w, h);
                for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
                    let c = src.demultiply();
                    dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
                }
                Some(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn decodes_png_and_keeps_bytes() {
        let bytes = tiny_png();
        let src = ImageSource::decode(bytes.clone()).unwrap();
        assert_eq!(src.natural_size(), (2.0, 3.0));
        assert_eq!(src.mime(), "image/png");
        assert!(src.data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn decodes_svg_and_rasterizes_at_requested_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;
        let src = ImageSource::decode(svg.to_vec()).unwrap();
        assert_eq!(src.mime(), "image/svg+xml");
        let px = src.pixels(20, 20).unwrap();
        assert_eq!(px.dimensions(), (20, 20));
        assert_eq!(px.get_pixel(10, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            ImageSource::decode(b"nope".to_vec()),
            Err(SurfaceError::Decode(_))
        ));
    }
}
