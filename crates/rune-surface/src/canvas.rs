//! Raster backend: draws onto a tiny-skia pixmap at a DPI multiplier.

use engine_core::path::{self, Segment};
use engine_core::{
    BlendMode, Color, FillRule, FilterOp, LineCap, Paint, PatternFill, PatternPrim, Rect,
    StrokeStyle, Subpath, Transform2D, dpi, filter, paint,
};
use rune_text::OutlineCommand;
use tiny_skia::{
    GradientStop, LinearGradient, Mask, Pattern, Pixmap, PathBuilder, RadialGradient, Shader,
    SpreadMode,
};
use tracing::warn;

use crate::error::{Result, SurfaceError};
use crate::source::ImageSource;
use crate::surface::{GlyphRun, Layer, LayerStack, Surface};

/// Flattened straight-alpha RGBA output of a raster render.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

pub struct Canvas {
    pixmap: Pixmap,
    layers: LayerStack,
}

fn ts(t: &Transform2D) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = t.to_f32_row();
    tiny_skia::Transform::from_row(a, b, c, d, e, f)
}

fn skia_color(c: Color, opacity: f32) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.with_opacity(opacity).a)
}

fn skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    use tiny_skia::BlendMode as B;
    match mode {
        BlendMode::Normal => B::SourceOver,
        BlendMode::Multiply => B::Multiply,
        BlendMode::Screen => B::Screen,
        BlendMode::Overlay => B::Overlay,
        BlendMode::Darken => B::Darken,
        BlendMode::Lighten => B::Lighten,
        BlendMode::ColorDodge => B::ColorDodge,
        BlendMode::ColorBurn => B::ColorBurn,
        BlendMode::HardLight => B::HardLight,
        BlendMode::SoftLight => B::SoftLight,
        BlendMode::Difference => B::Difference,
        BlendMode::Exclusion => B::Exclusion,
        BlendMode::Hue => B::Hue,
        BlendMode::Saturation => B::Saturation,
        BlendMode::Color => B::Color,
        BlendMode::Luminosity => B::Luminosity,
    }
}

/// Build a tiny-skia path; `None` when nothing drawable remains.
pub(crate) fn build_path(subpaths: &[Subpath]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for sub in subpaths {
        if !path::is_renderable(&sub.anchors) {
            continue;
        }
        let first = sub.anchors[0].point();
        pb.move_to(first.x as f32, first.y as f32);
        for seg in path::segments(&sub.anchors, sub.closed) {
            match seg {
                Segment::Line(_, p) => pb.line_to(p.x as f32, p.y as f32),
                Segment::Quad(_, c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
                Segment::Cubic(_, c1, c2, p) => pb.cubic_to(
                    c1.x as f32,
                    c1.y as f32,
                    c2.x as f32,
                    c2.y as f32,
                    p.x as f32,
                    p.y as f32,
                ),
            }
        }
        if sub.closed {
            pb.close();
        }
    }
    pb.finish()
}

fn outline_path(commands: &[OutlineCommand]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for cmd in commands {
        match *cmd {
            OutlineCommand::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            OutlineCommand::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            OutlineCommand::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            OutlineCommand::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            OutlineCommand::Close => pb.close(),
        }
    }
    pb.finish()
}

fn rect_path(rect: Rect) -> Option<tiny_skia::Path> {
    let r = tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32)?;
    Some(PathBuilder::from_rect(r))
}

fn skia_rule(rule: FillRule) -> tiny_skia::FillRule {
    match rule {
        FillRule::NonZero => tiny_skia::FillRule::Winding,
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
    }
}

fn gradient_stops(stops: &[paint::GradientStop], opacity: f32) -> Vec<GradientStop> {
    paint::sanitize_stops(stops)
        .into_iter()
        .map(|s| GradientStop::new(s.offset, skia_color(s.color, opacity)))
        .collect()
}

/// Premultiply straight RGBA into a pixmap.
fn pixmap_from_rgba(img: &image::RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

impl Canvas {
    /// A transparent canvas of `width`×`height` logical pixels rendered at
    /// `scale` physical pixels per logical pixel.
    pub fn new(width: f64, height: f64, scale: f64) -> Result<Self> {
        let (pw, ph) = dpi::physical_size(width, height, scale).ok_or(SurfaceError::Allocation {
            width: 0,
            height: 0,
        })?;
        let pixmap = Pixmap::new(pw, ph).ok_or(SurfaceError::Allocation {
            width: pw,
            height: ph,
        })?;
        let s = dpi::sanitize_scale(scale);
        Ok(Self {
            pixmap,
            layers: LayerStack::new(Transform2D::scale(s, s)),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn finish(self) -> RasterImage {
        let mut pixels = Vec::with_capacity(self.pixmap.data().len());
        for p in self.pixmap.pixels() {
            let c = p.demultiply();
            pixels.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RasterImage {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            pixels,
        }
    }

    fn shader(&self, paint: &Paint, opacity: f32) -> Shader<'static> {
        let solid = |c: Color| Shader::SolidColor(skia_color(c, opacity));
        let fallback = paint.stops().first().map_or(Color::TRANSPARENT, |s| s.color);
        match paint {
            Paint::Solid(c) => solid(*c),
            Paint::LinearGradient { start, end, stops } => LinearGradient::new(
                tiny_skia::Point::from_xy(start.x as f32, start.y as f32),
                tiny_skia::Point::from_xy(end.x as f32, end.y as f32),
                gradient_stops(stops, opacity),
                SpreadMode::Pad,
                tiny_skia::Transform::identity(),
            )
            .unwrap_or_else(|| solid(fallback)),
            Paint::RadialGradient {
                center,
                radius,
                stops,
            } => {
                let c = tiny_skia::Point::from_xy(center.x as f32, center.y as f32);
                RadialGradient::new(
                    c,
                    c,
                    *radius as f32,
                    gradient_stops(stops, opacity),
                    SpreadMode::Pad,
                    tiny_skia::Transform::identity(),
                )
                .unwrap_or_else(|| solid(fallback))
            }
        }
    }

    fn base_paint<'a>(&self) -> tiny_skia::Paint<'a> {
        let state = self.layers.current();
        tiny_skia::Paint {
            anti_alias: true,
            blend_mode: skia_blend(state.blend),
            ..tiny_skia::Paint::default()
        }
    }

    fn fill_with(
        &mut self,
        path: &tiny_skia::Path,
        shader: Shader<'_>,
        rule: FillRule,
        transform: &Transform2D,
        mask: Option<&Mask>,
    ) {
        let mut p = self.base_paint();
        p.shader = shader;
        self.pixmap
            .fill_path(path, &p, skia_rule(rule), ts(transform), mask);
    }

    fn clip_mask(&self, path: &tiny_skia::Path, rule: FillRule) -> Option<Mask> {
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        let state = self.layers.current();
        mask.fill_path(path, skia_rule(rule), true, ts(&state.transform));
        Some(mask)
    }

    fn draw_pattern_prim(&mut self, prim: &PatternPrim, mask: &Mask) {
        let state = self.layers.current();
        let t = state.transform;
        match prim {
            PatternPrim::Rect { rect, color } => {
                if let Some(p) = rect_path(*rect) {
                    let shader = Shader::SolidColor(skia_color(*color, state.opacity));
                    self.fill_with(&p, shader, FillRule::NonZero, &t, Some(mask));
                }
            }
            PatternPrim::Circle {
                center,
                radius,
                color,
            } => {
                if let Some(p) = PathBuilder::from_circle(center.x as f32, center.y as f32, *radius as f32) {
                    let shader = Shader::SolidColor(skia_color(*color, state.opacity));
                    self.fill_with(&p, shader, FillRule::NonZero, &t, Some(mask));
                }
            }
            PatternPrim::Polygon { points, color } => {
                let mut pb = PathBuilder::new();
                for (i, pt) in points.iter().enumerate() {
                    if i == 0 {
                        pb.move_to(pt.x as f32, pt.y as f32);
                    } else {
                        pb.line_to(pt.x as f32, pt.y as f32);
                    }
                }
                pb.close();
                if let Some(p) = pb.finish() {
                    let shader = Shader::SolidColor(skia_color(*color, state.opacity));
                    self.fill_with(&p, shader, FillRule::NonZero, &t, Some(mask));
                }
            }
            PatternPrim::Line {
                from,
                to,
                width,
                color,
            } => {
                let mut pb = PathBuilder::new();
                pb.move_to(from.x as f32, from.y as f32);
                pb.line_to(to.x as f32, to.y as f32);
                if let Some(p) = pb.finish() {
                    let mut paint = self.base_paint();
                    paint.shader = Shader::SolidColor(skia_color(*color, state.opacity));
                    let stroke = tiny_skia::Stroke {
                        width: *width as f32,
                        ..tiny_skia::Stroke::default()
                    };
                    self.pixmap
                        .stroke_path(&p, &paint, &stroke, ts(&t), Some(mask));
                }
            }
        }
    }
}

impl Surface for Canvas {
    fn push_layer(&mut self, layer: Layer) {
        self.layers.push(&layer);
    }

    fn pop_layer(&mut self) {
        if !self.layers.pop() {
            warn!("unbalanced pop_layer on raster canvas");
        }
    }

    fn fill_path(&mut self, path: &[Subpath], paint: &Paint, rule: FillRule) {
        let Some(p) = build_path(path) else { return };
        let state = self.layers.current();
        let shader = self.shader(paint, state.opacity);
        self.fill_with(&p, shader, rule, &state.transform, None);
    }

    fn stroke_path(&mut self, path: &[Subpath], stroke: &StrokeStyle) {
        if !stroke.is_visible() {
            return;
        }
        let Some(p) = build_path(path) else { return };
        let state = self.layers.current();
        let mut paint = self.base_paint();
        paint.shader = Shader::SolidColor(skia_color(stroke.color, state.opacity));
        let line_cap = match stroke.cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        };
        let dash = if stroke.dash.len() >= 2 {
            tiny_skia::StrokeDash::new(stroke.dash.iter().map(|d| *d as f32).collect(), 0.0)
        } else {
            None
        };
        let s = tiny_skia::Stroke {
            width: stroke.width as f32,
            line_cap,
            line_join: tiny_skia::LineJoin::Round,
            dash,
            ..tiny_skia::Stroke::default()
        };
        self.pixmap
            .stroke_path(&p, &paint, &s, ts(&state.transform), None);
    }

    fn fill_pattern(&mut self, path: &[Subpath], pattern: &PatternFill, rule: FillRule) {
        let Some(p) = build_path(path) else { return };
        let Some(mask) = self.clip_mask(&p, rule) else { return };
        let bg = PatternPrim::Rect {
            rect: Rect::new(0.0, 0.0, pattern.width, pattern.height),
            color: pattern.background,
        };
        self.draw_pattern_prim(&bg, &mask);
        for prim in &pattern.prims {
            self.draw_pattern_prim(prim, &mask);
        }
    }

    fn draw_image(&mut self, image: &ImageSource, rect: Rect, filters: &[FilterOp], tiled: bool) {
        let state = self.layers.current();
        let (nat_w, nat_h) = image.natural_size();
        // Physical resolution the image will cover, so SVG sources render
        // crisply; raster sources ignore it.
        let res = state.transform.max_scale().max(f64::EPSILON);
        let (tile_w, tile_h) = if tiled { (nat_w, nat_h) } else { (rect.w, rect.h) };
        let px_w = (tile_w * res).ceil().clamp(1.0, 16384.0) as u32;
        let px_h = (tile_h * res).ceil().clamp(1.0, 16384.0) as u32;
        let Some(mut pixels) = image.pixels(px_w, px_h) else {
            self.draw_placeholder(rect);
            return;
        };
        filter::apply_rgba(filters, &mut pixels);
        let Some(pixmap) = pixmap_from_rgba(&pixels) else {
            self.draw_placeholder(rect);
            return;
        };
        let (img_w, img_h) = (pixmap.width() as f64, pixmap.height() as f64);
        let (sx, sy) = (tile_w / img_w, tile_h / img_h);
        let shader_ts = tiny_skia::Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            rect.x as f32,
            rect.y as f32,
        );
        let spread = if tiled { SpreadMode::Repeat } else { SpreadMode::Pad };
        let shader = Pattern::new(
            pixmap.as_ref(),
            spread,
            tiny_skia::FilterQuality::Bilinear,
            state.opacity,
            shader_ts,
        );
        if let Some(p) = rect_path(rect) {
            self.fill_with(&p, shader, FillRule::NonZero, &state.transform, None);
        }
    }

    fn draw_glyphs(&mut self, run: &GlyphRun<'_>) {
        let state = self.layers.current();
        for glyph in run.glyphs {
            if glyph.is_blank() {
                continue;
            }
            let place = state
                .transform
                .then(&Transform2D::translate(glyph.origin.x, glyph.origin.y))
                .then(&Transform2D::rotate(glyph.angle));
            match run.font {
                Some(font) => {
                    let Some(outline) = font.glyph_outline(&glyph.text, run.size) else {
                        continue;
                    };
                    if let Some(p) = outline_path(&outline) {
                        let shader = Shader::SolidColor(skia_color(run.color, state.opacity));
                        self.fill_with(&p, shader, FillRule::NonZero, &place, None);
                    }
                }
                None => {
                    let h = run.size as f64 * 0.7;
                    let cell = Rect::new(0.0, -h, glyph.advance * 0.9, h);
                    if let Some(p) = rect_path(cell) {
                        let shader = Shader::SolidColor(skia_color(Color::PLACEHOLDER, state.opacity));
                        self.fill_with(&p, shader, FillRule::NonZero, &place, None);
                    }
                }
            }
        }
    }

    fn draw_placeholder(&mut self, rect: Rect) {
        let state = self.layers.current();
        if let Some(p) = rect_path(rect) {
            let shader = Shader::SolidColor(skia_color(Color::PLACEHOLDER, state.opacity));
            self.fill_with(&p, shader, FillRule::NonZero, &state.transform, None);
        }
    }
}

/// Closed rectangle subpath, handy for backgrounds and bounds.
pub fn rect_subpath(rect: Rect) -> Subpath {
    Subpath {
        anchors: engine_core::shapes::rect(rect.w, rect.h, 0.0)
            .into_iter()
            .map(|mut a| {
                a.x += rect.x;
                a.y += rect.y;
                a
            })
            .collect(),
        closed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Anchor;

    fn square(x: f64, y: f64, s: f64) -> Vec<Subpath> {
        vec![rect_subpath(Rect::new(x, y, s, s))]
    }

    #[test]
    fn canvas_size_follows_dpi() {
        let canvas = Canvas::new(100.0, 40.0, 3.0).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (300, 120));
        assert!(Canvas::new(0.0, 40.0, 3.0).is_err());
    }

    #[test]
    fn fills_in_logical_coordinates() {
        let mut canvas = Canvas::new(10.0, 10.0, 2.0).unwrap();
        canvas.fill_path(&square(0.0, 0.0, 5.0), &Paint::Solid(Color::rgb(255, 0, 0)), FillRule::NonZero);
        let img = canvas.finish();
        assert_eq!(img.pixel(4, 4), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(15, 15), Some([0, 0, 0, 0]));
    }

    #[test]
    fn layer_opacity_and_transform_apply() {
        let mut canvas = Canvas::new(20.0, 20.0, 1.0).unwrap();
        canvas.push_layer(Layer::new(Transform2D::translate(10.0, 10.0), 0.5, BlendMode::Normal));
        canvas.fill_path(&square(0.0, 0.0, 5.0), &Paint::Solid(Color::rgb(0, 0, 255)), FillRule::NonZero);
        canvas.pop_layer();
        let img = canvas.finish();
        let px = img.pixel(12, 12).unwrap();
        assert!(px[2] >= 250);
        assert!((px[3] as i32 - 128).abs() <= 2);
        assert_eq!(img.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn short_paths_draw_nothing() {
        let mut canvas = Canvas::new(10.0, 10.0, 1.0).unwrap();
        let single = vec![Subpath {
            anchors: vec![Anchor::new(5.0, 5.0)],
            closed: true,
        }];
        canvas.fill_path(&single, &Paint::Solid(Color::BLACK), FillRule::NonZero);
        canvas.stroke_path(&single, &StrokeStyle::solid(4.0, Color::BLACK));
        canvas.fill_path(&[], &Paint::Solid(Color::BLACK), FillRule::NonZero);
        let img = canvas.finish();
        assert!(img.pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn pattern_is_clipped_to_path() {
        let mut canvas = Canvas::new(20.0, 20.0, 1.0).unwrap();
        let fill = PatternFill {
            width: 20.0,
            height: 20.0,
            background: Color::rgb(0, 255, 0),
            prims: Vec::new(),
        };
        canvas.fill_pattern(&square(0.0, 0.0, 10.0), &fill, FillRule::NonZero);
        let img = canvas.finish();
        assert_eq!(img.pixel(5, 5), Some([0, 255, 0, 255]));
        assert_eq!(img.pixel(15, 15), Some([0, 0, 0, 0]));
    }

    #[test]
    fn missing_font_draws_placeholder_cells() {
        let glyphs = rune_text::layout_lines("A", &rune_text::FixedAdvance(10.0), 10.0, 100.0, rune_text::TextAlign::Left);
        let mut canvas = Canvas::new(20.0, 20.0, 1.0).unwrap();
        canvas.draw_glyphs(&GlyphRun {
            glyphs: &glyphs,
            font: None,
            family: "Nope",
            size: 10.0,
            color: Color::BLACK,
        });
        let img = canvas.finish();
        let c = Color::PLACEHOLDER;
        assert_eq!(img.pixel(4, 5), Some([c.r, c.g, c.b, 255]));
    }
}
