//! Vector backend: records drawing calls as an SVG document.
//!
//! Layers become nested `<g>` elements carrying their own transform and a
//! `mix-blend-mode` style. Opacity is cumulative and written on each leaf
//! element, so the result matches the raster backend.

use std::fmt::Write;

use engine_core::path::{self, Segment};
use engine_core::{
    BlendMode, Color, FillRule, FilterOp, Paint, PatternFill, PatternPrim, Rect, StrokeStyle,
    Subpath, Transform2D, filter, paint,
};
use tracing::warn;

use crate::source::ImageSource;
use crate::surface::{GlyphRun, Layer, LayerStack, Surface};

pub struct SvgDocument {
    width: f64,
    height: f64,
    defs: String,
    body: String,
    layers: LayerStack,
    next_id: usize,
}

/// Escape text for element content and attribute values.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Shortest decimal form, rounded to 1e-4.
fn num(v: f64) -> String {
    let r = (v * 10_000.0).round() / 10_000.0;
    if r == 0.0 { "0".to_string() } else { format!("{r}") }
}

fn path_data(subpaths: &[Subpath]) -> String {
    let mut d = String::new();
    for sub in subpaths {
        if !path::is_renderable(&sub.anchors) {
            continue;
        }
        let first = sub.anchors[0].point();
        let _ = write!(d, "M{} {}", num(first.x), num(first.y));
        for seg in path::segments(&sub.anchors, sub.closed) {
            let _ = match seg {
                Segment::Line(_, p) => write!(d, "L{} {}", num(p.x), num(p.y)),
                Segment::Quad(_, c, p) => {
                    write!(d, "Q{} {} {} {}", num(c.x), num(c.y), num(p.x), num(p.y))
                }
                Segment::Cubic(_, c1, c2, p) => write!(
                    d,
                    "C{} {} {} {} {} {}",
                    num(c1.x),
                    num(c1.y),
                    num(c2.x),
                    num(c2.y),
                    num(p.x),
                    num(p.y)
                ),
            };
        }
        if sub.closed {
            d.push('Z');
        }
    }
    d
}

fn matrix(t: &Transform2D) -> String {
    format!(
        "matrix({} {} {} {} {} {})",
        num(t.a),
        num(t.b),
        num(t.c),
        num(t.d),
        num(t.tx),
        num(t.ty)
    )
}

fn rule_name(rule: FillRule) -> &'static str {
    match rule {
        FillRule::NonZero => "nonzero",
        FillRule::EvenOdd => "evenodd",
    }
}

/// `fill`/`stroke` color plus its opacity attribute.
fn color_attrs(kind: &str, c: Color, opacity: f32) -> String {
    let a = c.alpha_f32() * opacity;
    if a >= 1.0 {
        format!(r#"{kind}="{}""#, c.to_hex_rgb())
    } else {
        format!(r#"{kind}="{}" {kind}-opacity="{}""#, c.to_hex_rgb(), num(a as f64))
    }
}

impl SvgDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
            layers: LayerStack::new(Transform2D::identity()),
            next_id: 0,
        }
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn opacity(&self) -> f32 {
        self.layers.current().opacity
    }

    fn gradient(&mut self, paint: &Paint) -> Option<String> {
        let stops = paint::sanitize_stops(paint.stops());
        if stops.is_empty() {
            return None;
        }
        let id = self.id("g");
        let opacity = self.opacity();
        let mut stop_xml = String::new();
        for s in &stops {
            let _ = write!(
                stop_xml,
                r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
                num(s.offset as f64),
                s.color.to_hex_rgb(),
                num((s.color.alpha_f32() * opacity) as f64)
            );
        }
        match paint {
            Paint::Solid(_) => return None,
            Paint::LinearGradient { start, end, .. } => {
                let _ = write!(
                    self.defs,
                    r#"<linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}">{stop_xml}</linearGradient>"#,
                    num(start.x),
                    num(start.y),
                    num(end.x),
                    num(end.y)
                );
            }
            Paint::RadialGradient { center, radius, .. } => {
                let _ = write!(
                    self.defs,
                    r#"<radialGradient id="{id}" gradientUnits="userSpaceOnUse" cx="{}" cy="{}" r="{}">{stop_xml}</radialGradient>"#,
                    num(center.x),
                    num(center.y),
                    num(*radius)
                );
            }
        }
        Some(id)
    }

    fn prim_xml(&self, prim: &PatternPrim, out: &mut String) {
        let opacity = self.opacity();
        let _ = match prim {
            PatternPrim::Rect { rect, color } => write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" {}/>"#,
                num(rect.x),
                num(rect.y),
                num(rect.w),
                num(rect.h),
                color_attrs("fill", *color, opacity)
            ),
            PatternPrim::Circle {
                center,
                radius,
                color,
            } => write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" {}/>"#,
                num(center.x),
                num(center.y),
                num(*radius),
                color_attrs("fill", *color, opacity)
            ),
            PatternPrim::Line {
                from,
                to,
                width,
                color,
            } => write!(
                out,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke-width="{}" {}/>"#,
                num(from.x),
                num(from.y),
                num(to.x),
                num(to.y),
                num(*width),
                color_attrs("stroke", *color, opacity)
            ),
            PatternPrim::Polygon { points, color } => {
                let pts: Vec<String> = points
                    .iter()
                    .map(|p| format!("{},{}", num(p.x), num(p.y)))
                    .collect();
                write!(
                    out,
                    r#"<polygon points="{}" {}/>"#,
                    pts.join(" "),
                    color_attrs("fill", *color, opacity)
                )
            }
        };
    }

    fn placeholder_rect(&mut self, rect: Rect) {
        let fill = color_attrs("fill", Color::PLACEHOLDER, self.opacity());
        let _ = write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" {fill}/>"#,
            num(rect.x),
            num(rect.y),
            num(rect.w),
            num(rect.h)
        );
    }

    /// Serialize the document.
    pub fn finish(mut self) -> String {
        while self.layers.depth() > 0 {
            warn!("closing unbalanced layer in svg document");
            self.layers.pop();
            self.body.push_str("</g>");
        }
        let (w, h) = (num(self.width), num(self.height));
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        if !self.defs.is_empty() {
            let _ = write!(out, "<defs>{}</defs>", self.defs);
        }
        out.push_str(&self.body);
        out.push_str("</svg>");
        out
    }
}

impl Surface for SvgDocument {
    fn push_layer(&mut self, layer: Layer) {
        self.layers.push(&layer);
        let mut attrs = String::new();
        if !layer.transform.is_identity(1e-12) {
            let _ = write!(attrs, r#" transform="{}""#, matrix(&layer.transform));
        }
        if layer.blend != BlendMode::Normal {
            let _ = write!(attrs, r#" style="mix-blend-mode:{}""#, layer.blend.css_name());
        }
        let _ = write!(self.body, "<g{attrs}>");
    }

    fn pop_layer(&mut self) {
        if self.layers.pop() {
            self.body.push_str("</g>");
        } else {
            warn!("unbalanced pop_layer on svg document");
        }
    }

    fn fill_path(&mut self, path: &[Subpath], paint: &Paint, rule: FillRule) {
        let d = path_data(path);
        if d.is_empty() {
            return;
        }
        let fill = match paint {
            Paint::Solid(c) => color_attrs("fill", *c, self.opacity()),
            gradient => match self.gradient(gradient) {
                Some(id) => format!(r#"fill="url(#{id})""#),
                None => return,
            },
        };
        let _ = write!(
            self.body,
            r#"<path d="{d}" fill-rule="{}" {fill}/>"#,
            rule_name(rule)
        );
    }

    fn stroke_path(&mut self, path: &[Subpath], stroke: &StrokeStyle) {
        if !stroke.is_visible() {
            return;
        }
        let d = path_data(path);
        if d.is_empty() {
            return;
        }
        let cap = match stroke.cap {
            engine_core::LineCap::Butt => "butt",
            engine_core::LineCap::Round => "round",
            engine_core::LineCap::Square => "square",
        };
        let mut attrs = color_attrs("stroke", stroke.color, self.opacity());
        if stroke.dash.len() >= 2 {
            let dash: Vec<String> = stroke.dash.iter().map(|v| num(*v)).collect();
            let _ = write!(attrs, r#" stroke-dasharray="{}""#, dash.join(" "));
        }
        let _ = write!(
            self.body,
            r#"<path d="{d}" fill="none" stroke-width="{}" stroke-linecap="{cap}" stroke-linejoin="round" {attrs}/>"#,
            num(stroke.width)
        );
    }

    fn fill_pattern(&mut self, path: &[Subpath], pattern: &PatternFill, rule: FillRule) {
        let d = path_data(path);
        if d.is_empty() {
            return;
        }
        let id = self.id("clip");
        let _ = write!(
            self.defs,
            r#"<clipPath id="{id}"><path d="{d}" clip-rule="{}"/></clipPath>"#,
            rule_name(rule)
        );
        let mut content = String::new();
        self.prim_xml(
            &PatternPrim::Rect {
                rect: Rect::new(0.0, 0.0, pattern.width, pattern.height),
                color: pattern.background,
            },
            &mut content,
        );
        for prim in &pattern.prims {
            self.prim_xml(prim, &mut content);
        }
        let _ = write!(self.body, r#"<g clip-path="url(#{id})">{content}</g>"#);
    }

    fn draw_image(&mut self, image: &ImageSource, rect: Rect, filters: &[FilterOp], tiled: bool) {
        let filter_attr = if filters.is_empty() {
            String::new()
        } else {
            let id = self.id("f");
            let _ = write!(
                self.defs,
                r#"<filter id="{id}" color-interpolation-filters="sRGB">{}</filter>"#,
                filter::svg_primitives(filters)
            );
            format!(r#" filter="url(#{id})""#)
        };
        let opacity = self.opacity();
        let opacity_attr = if opacity < 1.0 {
            format!(r#" opacity="{}""#, num(opacity as f64))
        } else {
            String::new()
        };
        let uri = image.data_uri();
        if tiled {
            let (nw, nh) = image.natural_size();
            let id = self.id("p");
            let _ = write!(
                self.defs,
                r#"<pattern id="{id}" patternUnits="userSpaceOnUse" x="{}" y="{}" width="{}" height="{}"><image href="{uri}" width="{}" height="{}" preserveAspectRatio="none"/></pattern>"#,
                num(rect.x),
                num(rect.y),
                num(nw),
                num(nh),
                num(nw),
                num(nh)
            );
            let _ = write!(
                self.body,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#{id})"{filter_attr}{opacity_attr}/>"#,
                num(rect.x),
                num(rect.y),
                num(rect.w),
                num(rect.h)
            );
        } else {
            let _ = write!(
                self.body,
                r#"<image href="{uri}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none"{filter_attr}{opacity_attr}/>"#,
                num(rect.x),
                num(rect.y),
                num(rect.w),
                num(rect.h)
            );
        }
    }

    fn draw_glyphs(&mut self, run: &GlyphRun<'_>) {
        if run.font.is_none() {
            let h = run.size as f64 * 0.7;
            for glyph in run.glyphs.iter().filter(|g| !g.is_blank()) {
                let t = Transform2D::translate(glyph.origin.x, glyph.origin.y)
                    .then(&Transform2D::rotate(glyph.angle));
                let fill = color_attrs("fill", Color::PLACEHOLDER, self.opacity());
                let _ = write!(
                    self.body,
                    r#"<rect x="0" y="{}" width="{}" height="{}" transform="{}" {fill}/>"#,
                    num(-h),
                    num(glyph.advance * 0.9),
                    num(h),
                    matrix(&t)
                );
            }
            return;
        }
        if run.glyphs.is_empty() {
            return;
        }
        let fill = color_attrs("fill", run.color, self.opacity());
        let _ = write!(
            self.body,
            r#"<text font-family="{}" font-size="{}" {fill} xml:space="preserve">"#,
            escape_xml(run.family),
            num(run.size as f64)
        );
        for glyph in run.glyphs {
            let _ = write!(
                self.body,
                r#"<tspan x="{}" y="{}" rotate="{}">{}</tspan>"#,
                num(glyph.origin.x),
                num(glyph.origin.y),
                num(glyph.angle_deg()),
                escape_xml(&glyph.text)
            );
        }
        self.body.push_str("</text>");
    }

    fn draw_placeholder(&mut self, rect: Rect) {
        self.placeholder_rect(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::rect_subpath;
    use engine_core::{GradientStop, Point};

    #[test]
    fn empty_document_has_header_and_viewbox() {
        let svg = SvgDocument::new(200.0, 100.5).finish();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("width=\"200\" height=\"100.5\" viewBox=\"0 0 200 100.5\""));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn fills_use_hex_color_and_layer_opacity() {
        let mut doc = SvgDocument::new(10.0, 10.0);
        doc.push_layer(Layer::new(Transform2D::translate(2.0, 3.0), 0.5, BlendMode::Multiply));
        doc.fill_path(
            &[rect_subpath(Rect::new(0.0, 0.0, 4.0, 4.0))],
            &Paint::Solid(Color::rgb(255, 0, 0)),
            FillRule::EvenOdd,
        );
        doc.pop_layer();
        let svg = doc.finish();
        assert!(svg.contains(r#"<g transform="matrix(1 0 0 1 2 3)" style="mix-blend-mode:multiply">"#));
        assert!(svg.contains(r##"fill="#ff0000" fill-opacity="0.5""##));
        assert!(svg.contains(r#"fill-rule="evenodd""#));
        assert!(svg.contains("M0 0L4 0L4 4L0 4"));
    }

    #[test]
    fn gradients_go_into_defs() {
        let mut doc = SvgDocument::new(10.0, 10.0);
        let paint = Paint::LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
            stops: vec![
                GradientStop { offset: 0.0, color: Color::BLACK },
                GradientStop { offset: 1.0, color: Color::WHITE },
            ],
        };
        doc.fill_path(&[rect_subpath(Rect::new(0.0, 0.0, 10.0, 10.0))], &paint, FillRule::NonZero);
        let svg = doc.finish();
        let defs = svg.find("<linearGradient id=\"g1\"").unwrap();
        let use_site = svg.find("fill=\"url(#g1)\"").unwrap();
        assert!(defs < use_site);
        assert_eq!(svg.matches("<stop ").count(), 2);
    }

    #[test]
    fn missing_font_emits_placeholder_boxes() {
        let glyphs = rune_text::layout_lines(
            "a<&",
            &rune_text::FixedAdvance(5.0),
            10.0,
            100.0,
            rune_text::TextAlign::Left,
        );
        let mut doc = SvgDocument::new(50.0, 20.0);
        doc.draw_glyphs(&GlyphRun {
            glyphs: &glyphs,
            font: None,
            family: "Sans",
            size: 10.0,
            color: Color::BLACK,
        });
        let svg = doc.finish();
        assert_eq!(svg.matches("fill=\"#cccccc\"").count(), 3);
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_xml(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }

    #[test]
    fn unbalanced_layers_are_closed() {
        let mut doc = SvgDocument::new(1.0, 1.0);
        doc.push_layer(Layer::new(Transform2D::identity(), 1.0, BlendMode::Normal));
        doc.pop_layer();
        doc.pop_layer();
        doc.push_layer(Layer::new(Transform2D::identity(), 1.0, BlendMode::Normal));
        let svg = doc.finish();
        assert_eq!(svg.matches("<g>").count(), 2);
        assert_eq!(svg.matches("</g>").count(), 2);
    }
}
