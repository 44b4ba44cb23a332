//! Scene documents as handed over by the editor: a canvas plus a tree of
//! nodes. Everything here is plain data deserialized with serde; the
//! renderer reads it and never mutates it.

use engine_core::{
    Anchor, BlendMode, Color, FillRule, FilterSet, GradientStop, LineCap, Paint, PatternSpec,
    Point, ShapeKind, StrokeStyle, path_codec,
};
use rune_text::{TextAlign, WarpSpec};
use serde::{Deserialize, Serialize};

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn one_f32() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    #[serde(default = "Fill::white")]
    pub background: Fill,
    /// Transparent exports leave the background out.
    #[serde(default = "yes")]
    pub include_background: bool,
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: Fill::white(),
            include_background: true,
            nodes: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Depth-first walk over every node, groups before their children.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(&'a SceneNode)) {
        fn visit<'a>(nodes: &'a [SceneNode], f: &mut impl FnMut(&'a SceneNode)) {
            for node in nodes {
                f(node);
                if let NodeKind::Group(group) = &node.kind {
                    visit(&group.children, f);
                }
            }
        }
        visit(&self.nodes, &mut f);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Unscaled box size.
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Degrees, clockwise on screen.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default = "one_f32")]
    pub opacity: f32,
    #[serde(default)]
    pub blend: Option<BlendMode>,
    #[serde(default = "yes")]
    pub visible: bool,
    /// Editor-only; rendering ignores it.
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            blend: None,
            visible: true,
            locked: false,
            kind,
        }
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Shape(_) => "shape",
            NodeKind::Text(_) => "text",
            NodeKind::Image(_) => "image",
            NodeKind::Line(_) => "line",
            NodeKind::Sticker(_) => "sticker",
            NodeKind::Texture(_) => "texture",
            NodeKind::Path(_) => "path",
            NodeKind::Group(_) => "group",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Shape(ShapeNode),
    Text(TextNode),
    Image(ImageNode),
    Line(LineNode),
    Sticker(ImageNode),
    /// Repeats its image at natural size across the box.
    Texture(ImageNode),
    Path(PathNode),
    Group(GroupNode),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeNode {
    #[serde(default)]
    pub shape: ShapeKind,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub stroke: Option<StrokeSpec>,
    /// Takes precedence over `fill`.
    #[serde(default)]
    pub pattern: Option<PatternSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub font: FontSpec,
    #[serde(default = "Fill::black")]
    pub fill: Fill,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub warp: Option<WarpSpec>,
    /// Id of a path node to run the text along.
    #[serde(default)]
    pub path_ref: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Falls back to the configured default family.
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default = "default_font_size")]
    pub size: f32,
}

fn default_font_size() -> f32 {
    24.0
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: None,
            size: default_font_size(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    /// File path relative to the asset root, or a `data:` URI.
    pub src: String,
    #[serde(default)]
    pub filters: FilterSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineNode {
    /// End point relative to the start at the node origin.
    pub dx: f64,
    pub dy: f64,
    /// Bow of the line as a fraction of its length; 0 is straight.
    #[serde(default)]
    pub curvature: f64,
    #[serde(default = "StrokeSpec::hairline")]
    pub stroke: StrokeSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    /// Path string alternative to `anchors`; used when `anchors` is empty.
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub fill_rule: FillRule,
    #[serde(default)]
    pub stroke: Option<StrokeSpec>,
    #[serde(default)]
    pub brush: Option<BrushMeta>,
}

impl PathNode {
    /// The anchor list and closed flag this node draws.
    pub fn geometry(&self) -> (Vec<Anchor>, bool) {
        match (&self.d, self.anchors.is_empty()) {
            (Some(d), true) => {
                let (anchors, closed) = path_codec::decode(d);
                (anchors, closed || self.closed)
            }
            _ => (self.anchors.clone(), self.closed),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushKind {
    /// Thin variable-width outline.
    Pencil,
    /// Variable-width outline driven by per-point pressure.
    Pressure,
    /// Fixed-width stroked centerline.
    Marker,
    /// Dot cloud around the points.
    Spray,
}

/// Freehand stroke metadata; the path anchors are the sampled pointer
/// positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrushMeta {
    pub kind: BrushKind,
    #[serde(default = "default_brush_size")]
    pub size: f64,
    #[serde(default)]
    pub color: Color,
    /// One value in [0, 1] per anchor; missing values read as 0.5.
    #[serde(default)]
    pub pressures: Vec<f32>,
}

fn default_brush_size() -> f64 {
    8.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeSpec {
    pub width: f64,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub cap: LineCap,
    #[serde(default)]
    pub dash: Vec<f64>,
}

impl StrokeSpec {
    pub(crate) fn hairline() -> Self {
        Self {
            width: 2.0,
            color: Color::BLACK,
            cap: LineCap::Round,
            dash: Vec::new(),
        }
    }

    pub fn style(&self) -> StrokeStyle {
        StrokeStyle {
            width: self.width,
            color: self.color,
            cap: self.cap,
            dash: self.dash.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Fill {
    Solid {
        color: Color,
    },
    LinearGradient {
        /// Degrees; 0 runs left to right, 90 top to bottom.
        #[serde(default)]
        angle: f64,
        #[serde(default)]
        stops: Vec<GradientStop>,
        /// Used when `stops` is empty.
        #[serde(default)]
        color: Color,
    },
    RadialGradient {
        #[serde(default)]
        stops: Vec<GradientStop>,
        #[serde(default)]
        color: Color,
    },
    Pattern(PatternSpec),
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Fill::Solid { color }
    }

    fn white() -> Self {
        Fill::solid(Color::WHITE)
    }

    fn black() -> Self {
        Fill::solid(Color::BLACK)
    }

    /// Single color standing in for the fill where only one can be used
    /// (text runs, pattern-less fallbacks).
    pub fn base_color(&self) -> Color {
        match self {
            Fill::Solid { color } => *color,
            Fill::LinearGradient { stops, color, .. } | Fill::RadialGradient { stops, color } => {
                stops.first().map_or(*color, |s| s.color)
            }
            Fill::Pattern(spec) => spec.primary,
        }
    }

    /// Paint for a `width`×`height` box at the local origin. Patterns have
    /// no paint; the renderer expands them separately.
    pub fn paint(&self, width: f64, height: f64) -> Option<Paint> {
        match self {
            Fill::Solid { color } => Some(Paint::Solid(*color)),
            Fill::LinearGradient { angle, stops, color } => {
                if stops.is_empty() {
                    return Some(Paint::Solid(*color));
                }
                let (sin, cos) = angle.to_radians().sin_cos();
                let half = (width * cos.abs() + height * sin.abs()) * 0.5;
                let (cx, cy) = (width * 0.5, height * 0.5);
                Some(Paint::LinearGradient {
                    start: Point::new(cx - cos * half, cy - sin * half),
                    end: Point::new(cx + cos * half, cy + sin * half),
                    stops: stops.clone(),
                })
            }
            Fill::RadialGradient { stops, color } => {
                if stops.is_empty() {
                    return Some(Paint::Solid(*color));
                }
                Some(Paint::RadialGradient {
                    center: Point::new(width * 0.5, height * 0.5),
                    radius: width.max(height) * 0.5,
                    stops: stops.clone(),
                })
            }
            Fill::Pattern(_) => None,
        }
    }
}
