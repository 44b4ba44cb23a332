//! rune-scene: scene documents, resource loading and rendering to raster or
//! vector output.

pub mod brush;
pub mod export;
pub mod model;
pub mod render;
pub mod resources;

pub use export::{ExportError, ExportJob, ExportOutput, export, export_as, export_batch};
pub use model::{
    BrushKind, BrushMeta, Fill, FontSpec, GroupNode, ImageNode, LineNode, NodeKind, PathNode,
    Scene, SceneNode, ShapeNode, StrokeSpec, TextNode,
};
pub use render::{RenderOptions, RenderStats, node_transform, render_scene};
pub use resources::{
    FsResolver, MemoryResolver, NullResolver, ResourceError, ResourceResolver, ResourceSet,
};
