//! engine-core: geometry, paths, shapes and paint primitives shared by the
//! rendering backends.

pub mod boolean;
pub mod color;
pub mod dpi;
pub mod filter;
pub mod geometry;
pub mod paint;
pub mod path;
pub mod path_codec;
pub mod pattern;
pub mod random;
pub mod shapes;
pub mod transform;

pub use boolean::{BooleanEngine, BooleanError, BooleanOp, Region};
pub use color::{Color, ColorParseError};
pub use filter::{FilterOp, FilterSet};
pub use geometry::{Point, Rect};
pub use paint::{BlendMode, FillRule, GradientStop, LineCap, Paint, StrokeStyle};
pub use path::{Anchor, Segment};
pub use path_codec::{PathError, Subpath};
pub use pattern::{PatternFill, PatternKind, PatternPrim, PatternSpec};
pub use random::{RandomSource, XorShift};
pub use shapes::{Placement, ShapeKind};
pub use transform::Transform2D;
