//! The drawing interface shared by the raster and vector backends.
//!
//! Coordinates passed to a [`Surface`] are in the local space of the current
//! layer. Layers nest: each push composes its transform with the parent's
//! and multiplies opacity, and a non-normal blend mode stays installed until
//! the matching pop.

use engine_core::{
    BlendMode, Color, FillRule, FilterOp, Paint, PatternFill, Rect, StrokeStyle, Subpath,
    Transform2D,
};
use rune_text::{FontFace, PlacedGlyph};

use crate::source::ImageSource;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layer {
    pub transform: Transform2D,
    pub opacity: f32,
    pub blend: BlendMode,
}

impl Layer {
    pub fn new(transform: Transform2D, opacity: f32, blend: BlendMode) -> Self {
        Self {
            transform,
            opacity,
            blend,
        }
    }
}

/// Glyphs of one text node, already placed in layer space.
pub struct GlyphRun<'a> {
    pub glyphs: &'a [PlacedGlyph],
    /// `None` when the font failed to load; backends draw placeholders.
    pub font: Option<&'a FontFace>,
    pub family: &'a str,
    pub size: f32,
    pub color: Color,
}

pub trait Surface {
    fn push_layer(&mut self, layer: Layer);
    fn pop_layer(&mut self);

    fn fill_path(&mut self, path: &[Subpath], paint: &Paint, rule: FillRule);
    fn stroke_path(&mut self, path: &[Subpath], stroke: &StrokeStyle);
    /// Fill `path` with a pattern laid out in layer space.
    fn fill_pattern(&mut self, path: &[Subpath], pattern: &PatternFill, rule: FillRule);
    /// Draw an image into `rect`, stretched, or repeated at natural size when
    /// `tiled`.
    fn draw_image(&mut self, image: &ImageSource, rect: Rect, filters: &[FilterOp], tiled: bool);
    fn draw_glyphs(&mut self, run: &GlyphRun<'_>);
    /// Visible stand-in for a resource that failed to load.
    fn draw_placeholder(&mut self, rect: Rect);
}

/// Effective state of the innermost layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerState {
    pub transform: Transform2D,
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Layer bookkeeping shared by the backends.
#[derive(Debug)]
pub struct LayerStack {
    stack: Vec<LayerState>,
}

impl LayerStack {
    pub fn new(base: Transform2D) -> Self {
        Self {
            stack: vec![LayerState {
                transform: base,
                opacity: 1.0,
                blend: BlendMode::Normal,
            }],
        }
    }

    pub fn current(&self) -> LayerState {
        // The base entry is never popped.
        self.stack[self.stack.len() - 1]
    }

    pub fn push(&mut self, layer: &Layer) -> LayerState {
        let parent = self.current();
        let state = LayerState {
            transform: parent.transform.then(&layer.transform),
            opacity: parent.opacity * layer.opacity.clamp(0.0, 1.0),
            blend: if layer.blend == BlendMode::Normal {
                parent.blend
            } else {
                layer.blend
            },
        };
        self.stack.push(state);
        state
    }

    /// Returns false on an unbalanced pop (the base layer stays).
    pub fn pop(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_multiplies_and_blend_inherits() {
        let mut stack = LayerStack::new(Transform2D::scale(3.0, 3.0));
        stack.push(&Layer::new(Transform2D::translate(10.0, 0.0), 0.5, BlendMode::Multiply));
        let inner = stack.push(&Layer::new(Transform2D::identity(), 0.5, BlendMode::Normal));
        assert_eq!(inner.opacity, 0.25);
        assert_eq!(inner.blend, BlendMode::Multiply);
        assert_eq!(inner.transform.tx, 30.0);
        assert!(stack.pop());
        assert!(stack.pop());
        assert!(!stack.pop());
        assert_eq!(stack.current().blend, BlendMode::Normal);
        assert_eq!(stack.depth(), 0);
    }
}
