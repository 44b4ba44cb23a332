//! Scene traversal.
//!
//! [`render_scene`] walks the node tree depth-first in paint order and
//! drives any [`Surface`]. Each node runs the same steps: skip if hidden,
//! push a layer (transform, opacity, blend), draw its kind, pop.

use std::collections::HashMap;

use engine_core::path::{self, Anchor};
use engine_core::{
    BlendMode, FillRule, Paint, PatternSpec, Point, Rect, ShapeKind, Subpath, Transform2D,
    XorShift, pattern,
};
use rune_config::RenderingConfig;
use rune_surface::{GlyphRun, Layer, Surface};
use rune_text::{ApproxMetrics, GlyphMeasure};
use tracing::{trace, warn};

use crate::brush::{BrushOutput, brush_output};
use crate::model::{
    Fill, ImageNode, LineNode, NodeKind, PathNode, Scene, SceneNode, ShapeNode, TextNode,
};
use crate::resources::ResourceSet;

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Arc-length steps for text on a path; never fewer than 200 are used.
    pub curve_samples: usize,
    /// Seed for randomized patterns; `None` seeds from the clock.
    pub pattern_seed: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            curve_samples: rune_text::MIN_SAMPLES,
            pattern_seed: None,
        }
    }
}

impl From<&RenderingConfig> for RenderOptions {
    fn from(config: &RenderingConfig) -> Self {
        Self {
            curve_samples: config.curve_samples,
            pattern_seed: config.pattern_seed,
        }
    }
}

/// Counters from one render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub hidden: usize,
    /// Images and text runs drawn as placeholders.
    pub placeholders: usize,
}

/// Object transform of a node: groups pivot on their origin, everything
/// else on its box center.
pub fn node_transform(node: &SceneNode) -> Transform2D {
    match node.kind {
        NodeKind::Group(_) => {
            Transform2D::about_origin(node.x, node.y, node.rotation, node.scale_x, node.scale_y)
        }
        _ => Transform2D::about_center(
            node.x,
            node.y,
            node.width,
            node.height,
            node.rotation,
            node.scale_x,
            node.scale_y,
        ),
    }
}

fn is_finite(t: &Transform2D) -> bool {
    [t.a, t.b, t.c, t.d, t.tx, t.ty].iter().all(|v| v.is_finite())
}

/// Render `scene` onto `surface`, background first, then the nodes in
/// list order.
pub fn render_scene(
    scene: &Scene,
    surface: &mut dyn Surface,
    resources: &ResourceSet,
    options: &RenderOptions,
) -> RenderStats {
    let mut paths = HashMap::new();
    index_paths(&scene.nodes, Transform2D::identity(), &mut paths);
    let mut renderer = Renderer {
        resources,
        options,
        paths,
        pattern_rng: match options.pattern_seed {
            Some(seed) => XorShift::seeded(seed),
            None => XorShift::from_clock(),
        },
        world: vec![Transform2D::identity()],
        stats: RenderStats::default(),
    };
    if scene.include_background {
        let bg = Subpath {
            anchors: ShapeKind::default().anchors(scene.width, scene.height),
            closed: true,
        };
        renderer.fill_region(
            surface,
            &[bg],
            &scene.background,
            FillRule::NonZero,
            scene.width,
            scene.height,
        );
    }
    for node in &scene.nodes {
        renderer.visit(surface, node);
    }
    renderer.stats
}

/// Path nodes by id with their scene-space transform, for path-following
/// text.
fn index_paths<'a>(
    nodes: &'a [SceneNode],
    parent: Transform2D,
    out: &mut HashMap<&'a str, (Transform2D, &'a PathNode)>,
) {
    for node in nodes {
        let world = parent.then(&node_transform(node));
        match &node.kind {
            NodeKind::Path(p) => {
                out.insert(node.id.as_str(), (world, p));
            }
            NodeKind::Group(g) => index_paths(&g.children, world, out),
            _ => {}
        }
    }
}

struct Renderer<'a> {
    resources: &'a ResourceSet,
    options: &'a RenderOptions,
    paths: HashMap<&'a str, (Transform2D, &'a PathNode)>,
    pattern_rng: XorShift,
    /// Scene-space transform of each open layer.
    world: Vec<Transform2D>,
    stats: RenderStats,
}

impl<'a> Renderer<'a> {
    fn current_world(&self) -> Transform2D {
        self.world.last().copied().unwrap_or_default()
    }

    fn visit(&mut self, surface: &mut dyn Surface, node: &SceneNode) {
        if !node.visible {
            trace!(id = %node.id, "skipping hidden node");
            self.stats.hidden += 1;
            return;
        }
        let local = node_transform(node);
        if !is_finite(&local) {
            warn!(id = %node.id, "skipping node with non-finite transform");
            return;
        }
        trace!(id = %node.id, kind = node.kind_name(), "visit");

        let blend = node.blend.unwrap_or(BlendMode::Normal);
        surface.push_layer(Layer::new(local, node.opacity, blend));
        let world = self.current_world().then(&local);
        self.world.push(world);

        match &node.kind {
            NodeKind::Shape(shape) => self.draw_shape(surface, node, shape),
            NodeKind::Text(text) => self.draw_text(surface, node, text),
            NodeKind::Image(img) | NodeKind::Sticker(img) => {
                self.draw_image(surface, node, img, false)
            }
            NodeKind::Texture(img) => self.draw_image(surface, node, img, true),
            NodeKind::Line(line) => draw_line(surface, line),
            NodeKind::Path(p) => self.draw_path(surface, node, p),
            NodeKind::Group(group) => {
                for child in &group.children {
                    self.visit(surface, child);
                }
            }
        }

        self.world.pop();
        surface.pop_layer();
        self.stats.drawn += 1;
    }

    fn pattern_fill(
        &mut self,
        spec: &PatternSpec,
        width: f64,
        height: f64,
    ) -> pattern::PatternFill {
        pattern::generate(spec, width, height, &mut self.pattern_rng)
    }

    /// Fill `region` with `fill`; patterns cover the `width`×`height` box.
    fn fill_region(
        &mut self,
        surface: &mut dyn Surface,
        region: &[Subpath],
        fill: &Fill,
        rule: FillRule,
        width: f64,
        height: f64,
    ) {
        match fill {
            Fill::Pattern(spec) => {
                let fill = self.pattern_fill(spec, width, height);
                surface.fill_pattern(region, &fill, rule);
            }
            other => {
                if let Some(paint) = other.paint(width, height) {
                    surface.fill_path(region, &paint, rule);
                }
            }
        }
    }

    fn draw_shape(&mut self, surface: &mut dyn Surface, node: &SceneNode, shape: &ShapeNode) {
        let outline = [Subpath {
            anchors: shape.shape.anchors(node.width, node.height),
            closed: true,
        }];
        if let Some(spec) = &shape.pattern {
            let fill = self.pattern_fill(spec, node.width, node.height);
            surface.fill_pattern(&outline, &fill, FillRule::NonZero);
        } else if let Some(fill) = &shape.fill {
            self.fill_region(surface, &outline, fill, FillRule::NonZero, node.width, node.height);
        }
        if let Some(stroke) = &shape.stroke {
            surface.stroke_path(&outline, &stroke.style());
        }
    }

    fn draw_image(
        &mut self,
        surface: &mut dyn Surface,
        node: &SceneNode,
        img: &ImageNode,
        tiled: bool,
    ) {
        let rect = Rect::new(0.0, 0.0, node.width, node.height);
        match self.resources.image(&img.src) {
            Some(source) => surface.draw_image(source, rect, &img.filters.ops(), tiled),
            None => {
                self.stats.placeholders += 1;
                surface.draw_placeholder(rect);
            }
        }
    }

    fn draw_text(&mut self, surface: &mut dyn Surface, node: &SceneNode, text: &TextNode) {
        let resources = self.resources;
        let family = resources.family_or_default(text.font.family.as_deref());
        let font = resources.font(family);
        if font.is_none() {
            self.stats.placeholders += 1;
        }
        let approx = ApproxMetrics;
        let measure: &dyn GlyphMeasure = match font {
            Some(face) => face,
            None => &approx,
        };
        let size = text.font.size;
        let color = text.fill.base_color();
        if let Some(path_id) = &text.path_ref {
            match self.paths.get(path_id.as_str()).copied() {
                Some((path_world, guide)) => {
                    if let Some(to_guide) = self
                        .current_world()
                        .inverse()
                        .map(|inv| inv.then(&path_world))
                    {
                        let (anchors, closed) = guide.geometry();
                        let samples =
                            rune_text::sample_path(&anchors, closed, self.options.curve_samples);
                        let layout = rune_text::layout_on_path(
                            &text.text, measure, size, &samples, text.align,
                        );
                        surface.push_layer(Layer::new(to_guide, 1.0, BlendMode::Normal));
                        surface.draw_glyphs(&GlyphRun {
                            glyphs: &layout.glyphs,
                            font,
                            family,
                            size,
                            color,
                        });
                        surface.pop_layer();
                        return;
                    }
                    warn!(id = %node.id, "text transform not invertible, laying out horizontally");
                }
                None => warn!(id = %node.id, path_ref = %path_id, "path_ref names no path node"),
            }
        }

        let glyphs = match &text.warp {
            Some(warp) => {
                let baseline: Vec<Anchor> = warp
                    .baseline(node.width, node.height)
                    .into_iter()
                    .map(|p| Anchor::new(p.x, p.y))
                    .collect();
                let samples = rune_text::sample_path(&baseline, false, self.options.curve_samples);
                rune_text::layout_on_path(&text.text, measure, size, &samples, text.align).glyphs
            }
            None => rune_text::layout_lines(&text.text, measure, size, node.width, text.align),
        };
        surface.draw_glyphs(&GlyphRun {
            glyphs: &glyphs,
            font,
            family,
            size,
            color,
        });
    }

    fn draw_path(&mut self, surface: &mut dyn Surface, node: &SceneNode, p: &PathNode) {
        let (anchors, closed) = p.geometry();
        if let Some(brush) = &p.brush {
            let points: Vec<Point> = anchors.iter().map(Anchor::point).collect();
            match brush_output(&points, brush, &node.id) {
                BrushOutput::Outline(outline) => {
                    surface.fill_path(&[outline], &Paint::Solid(brush.color), FillRule::NonZero)
                }
                BrushOutput::Centerline(line, style) => surface.stroke_path(&[line], &style),
                BrushOutput::Dots(dots) => {
                    let subpaths: Vec<Subpath> =
                        dots.iter().map(|&(c, r)| dot_subpath(c, r)).collect();
                    surface.fill_path(&subpaths, &Paint::Solid(brush.color), FillRule::NonZero);
                }
                BrushOutput::Nothing => {}
            }
            return;
        }
        if !path::is_renderable(&anchors) {
            trace!(id = %node.id, anchors = anchors.len(), "path too short to draw");
            return;
        }
        let sub = [Subpath { anchors, closed }];
        if let Some(fill) = &p.fill {
            let (w, h) = path::bounds(&sub[0].anchors)
                .map_or((node.width, node.height), |b| (b.x + b.w, b.y + b.h));
            self.fill_region(surface, &sub, fill, p.fill_rule, w, h);
        }
        if let Some(stroke) = &p.stroke {
            surface.stroke_path(&sub, &stroke.style());
        }
    }
}

fn dot_subpath(center: Point, radius: f64) -> Subpath {
    let d = radius * 2.0;
    let anchors = engine_core::shapes::ellipse(d, d);
    let offset = Transform2D::translate(center.x - radius, center.y - radius);
    Subpath {
        anchors: path::transform_anchors(&anchors, &offset),
        closed: true,
    }
}

/// A line from the node origin to `(dx, dy)`, bowed by a quadratic control
/// point set off the chord midpoint by `curvature` × chord length.
pub fn line_anchors(line: &LineNode) -> Vec<Anchor> {
    let mut start = Anchor::new(0.0, 0.0);
    let end = Anchor::new(line.dx, line.dy);
    let len = line.dx.hypot(line.dy);
    if line.curvature != 0.0 && len > f64::EPSILON {
        let normal = Point::new(-line.dy / len, line.dx / len);
        let bow = line.curvature * len;
        start.cp2 = Some(Point::new(
            line.dx * 0.5 + normal.x * bow,
            line.dy * 0.5 + normal.y * bow,
        ));
    }
    vec![start, end]
}

fn draw_line(surface: &mut dyn Surface, line: &LineNode) {
    let anchors = line_anchors(line);
    if anchors[0].point().approx_eq(anchors[1].point(), f64::EPSILON) {
        return;
    }
    surface.stroke_path(
        &[Subpath {
            anchors,
            closed: false,
        }],
        &line.stroke.style(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupNode, StrokeSpec};
    use engine_core::{Color, FilterOp, Segment, StrokeStyle};
    use rune_surface::ImageSource;

    /// Records draw calls as strings.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Surface for Recorder {
        fn push_layer(&mut self, layer: Layer) {
            self.calls.push(format!("push {}", layer.opacity));
        }
        fn pop_layer(&mut self) {
            self.calls.push("pop".into());
        }
        fn fill_path(&mut self, path: &[Subpath], paint: &Paint, _rule: FillRule) {
            let color = match paint {
                Paint::Solid(c) => c.to_hex_rgb(),
                _ => "gradient".into(),
            };
            self.calls.push(format!("fill {} {color}", path.len()));
        }
        fn stroke_path(&mut self, path: &[Subpath], stroke: &StrokeStyle) {
            self.calls.push(format!("stroke {} {}", path.len(), stroke.width));
        }
        fn fill_pattern(&mut self, _path: &[Subpath], pattern: &pattern::PatternFill, _rule: FillRule) {
            self.calls.push(format!("pattern {}", pattern.prims.len()));
        }
        fn draw_image(&mut self, _image: &ImageSource, _rect: Rect, _filters: &[FilterOp], tiled: bool) {
            self.calls.push(format!("image {tiled}"));
        }
        fn draw_glyphs(&mut self, run: &GlyphRun<'_>) {
            self.calls.push(format!("glyphs {}", run.glyphs.len()));
        }
        fn draw_placeholder(&mut self, _rect: Rect) {
            self.calls.push("placeholder".into());
        }
    }

    fn rect_node(id: &str, color: Color) -> SceneNode {
        SceneNode::new(
            id,
            NodeKind::Shape(ShapeNode {
                shape: ShapeKind::default(),
                fill: Some(Fill::solid(color)),
                stroke: None,
                pattern: None,
            }),
        )
        .at(0.0, 0.0, 10.0, 10.0)
    }

    fn render(scene: &Scene) -> (Vec<String>, RenderStats) {
        let resources = ResourceSet::preload(scene, &crate::resources::NullResolver, None);
        let mut rec = Recorder::default();
        let stats = render_scene(scene, &mut rec, &resources, &RenderOptions::default());
        (rec.calls, stats)
    }

    #[test]
    fn hidden_nodes_emit_nothing() {
        let mut scene = Scene::new(20.0, 20.0);
        scene.include_background = false;
        let mut hidden = rect_node("a", Color::rgb(255, 0, 0));
        hidden.visible = false;
        scene.nodes.push(hidden);
        let (calls, stats) = render(&scene);
        assert!(calls.is_empty());
        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.drawn, 0);
    }

    #[test]
    fn group_children_paint_in_list_order() {
        let mut scene = Scene::new(20.0, 20.0);
        let mut group = SceneNode::new(
            "g",
            NodeKind::Group(GroupNode {
                children: vec![
                    rect_node("first", Color::rgb(255, 0, 0)),
                    rect_node("second", Color::rgb(0, 0, 255)),
                ],
            }),
        );
        group.opacity = 0.5;
        scene.nodes.push(group);
        let (calls, _) = render(&scene);
        assert_eq!(
            calls,
            vec![
                "fill 1 #ffffff",
                "push 0.5",
                "push 1",
                "fill 1 #ff0000",
                "pop",
                "push 1",
                "fill 1 #0000ff",
                "pop",
                "pop",
            ]
        );
    }

    #[test]
    fn short_paths_and_missing_images() {
        let mut scene = Scene::new(20.0, 20.0);
        scene.include_background = false;
        scene.nodes.push(SceneNode::new(
            "p",
            NodeKind::Path(PathNode {
                anchors: vec![Anchor::new(1.0, 1.0)],
                d: None,
                closed: true,
                fill: Some(Fill::solid(Color::BLACK)),
                fill_rule: FillRule::NonZero,
                stroke: Some(StrokeSpec {
                    width: 2.0,
                    color: Color::BLACK,
                    cap: Default::default(),
                    dash: Vec::new(),
                }),
                brush: None,
            }),
        ));
        scene.nodes.push(
            SceneNode::new(
                "i",
                NodeKind::Texture(ImageNode {
                    src: "nope.png".into(),
                    filters: Default::default(),
                }),
            )
            .at(0.0, 0.0, 5.0, 5.0),
        );
        let (calls, stats) = render(&scene);
        assert_eq!(calls, vec!["push 1", "pop", "push 1", "placeholder", "pop"]);
        assert_eq!(stats.placeholders, 1);
    }

    #[test]
    fn straight_and_curved_lines() {
        let straight = line_anchors(&LineNode {
            dx: 10.0,
            dy: 0.0,
            curvature: 0.0,
            stroke: StrokeSpec::hairline(),
        });
        assert!(matches!(
            Segment::between(&straight[0], &straight[1]),
            Segment::Line(..)
        ));
        let curved = line_anchors(&LineNode {
            dx: 10.0,
            dy: 0.0,
            curvature: 0.5,
            stroke: StrokeSpec::hairline(),
        });
        let Segment::Quad(_, c, _) = Segment::between(&curved[0], &curved[1]) else {
            panic!("expected a quadratic");
        };
        assert_eq!(c, Point::new(5.0, 5.0));
    }

    #[test]
    fn group_transform_pivots_on_origin() {
        let mut g = SceneNode::new("g", NodeKind::Group(GroupNode::default()));
        g.x = 10.0;
        g.width = 100.0;
        g.height = 100.0;
        g.rotation = 90.0;
        let p = node_transform(&g).apply(Point::new(0.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-9 && p.y.abs() < 1e-9);

        let mut s = rect_node("s", Color::BLACK);
        s.rotation = 180.0;
        let c = node_transform(&s).apply(Point::new(5.0, 5.0));
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn seeded_patterns_repeat() {
        let mut scene = Scene::new(50.0, 50.0);
        scene.background = Fill::Pattern(PatternSpec {
            kind: engine_core::PatternKind::Noise,
            primary: Color::BLACK,
            secondary: Color::WHITE,
            scale: 1.0,
        });
        let resources = ResourceSet::default();
        let options = RenderOptions {
            pattern_seed: Some(9),
            ..RenderOptions::default()
        };
        let mut a = Recorder::default();
        let mut b = Recorder::default();
        render_scene(&scene, &mut a, &resources, &options);
        render_scene(&scene, &mut b, &resources, &options);
        assert_eq!(a.calls, b.calls);
        assert!(a.calls[0].starts_with("pattern "));
    }
}
