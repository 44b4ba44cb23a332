//! Resource resolution for images and fonts.
//!
//! The renderer never touches the filesystem itself. A [`ResourceResolver`]
//! turns references into bytes or faces, and [`ResourceSet::preload`] asks
//! it once per unique reference before drawing starts. Anything that fails
//! to load is remembered as missing and drawn as a placeholder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rune_surface::{ImageSource, SurfaceError};
use rune_text::{FontError, FontFace, FontLibrary};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{NodeKind, Scene};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data URI: {0}")]
    DataUri(String),
    #[error(transparent)]
    Decode(#[from] SurfaceError),
    #[error(transparent)]
    Font(#[from] FontError),
}

/// Turns scene references into resource data.
pub trait ResourceResolver: Send + Sync {
    fn image_bytes(&self, reference: &str) -> Result<Vec<u8>, ResourceError>;
    fn font(&self, family: &str) -> Result<FontFace, ResourceError>;
}

/// Decode a `data:` URI. Base64 payloads are decoded; anything else is taken
/// as literal text (as in `data:image/svg+xml,<svg ...>`).
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ResourceError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ResourceError::DataUri(truncate(uri)))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ResourceError::DataUri(truncate(uri)))?;
    if meta.ends_with(";base64") {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(cleaned)
            .map_err(|e| ResourceError::DataUri(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(48).collect()
}

/// Resolve an asset path by checking, in order:
/// 1. Absolute path (as-is)
/// 2. Relative to the asset root
/// 3. Relative to the current directory
pub fn resolve_asset_path(root: Option<&Path>, reference: &Path) -> Option<PathBuf> {
    if reference.is_absolute() {
        return reference.exists().then(|| reference.to_path_buf());
    }
    if let Some(root) = root {
        let candidate = root.join(reference);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    reference.exists().then(|| reference.to_path_buf())
}

/// Files under an asset root, `data:` URIs, and fonts from the system plus
/// the root's `fonts/` directory.
#[derive(Debug)]
pub struct FsResolver {
    root: Option<PathBuf>,
    fonts: FontLibrary,
}

impl FsResolver {
    pub fn new(root: Option<PathBuf>) -> Self {
        let mut fonts = FontLibrary::system();
        if let Some(dir) = root.as_ref().map(|r| r.join("fonts")) {
            if dir.is_dir() {
                fonts.load_dir(&dir);
            }
        }
        Self { root, fonts }
    }
}

impl ResourceResolver for FsResolver {
    fn image_bytes(&self, reference: &str) -> Result<Vec<u8>, ResourceError> {
        if reference.starts_with("data:") {
            return decode_data_uri(reference);
        }
        let path = resolve_asset_path(self.root.as_deref(), Path::new(reference))
            .ok_or_else(|| ResourceError::NotFound(reference.to_string()))?;
        std::fs::read(&path).map_err(|source| ResourceError::Io { path, source })
    }

    fn font(&self, family: &str) -> Result<FontFace, ResourceError> {
        Ok(self.fonts.load_family(family)?)
    }
}

/// In-memory resources keyed by reference, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    images: HashMap<String, Vec<u8>>,
    fonts: HashMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(reference.into(), bytes);
        self
    }

    pub fn with_font(mut self, family: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.fonts.insert(family.into(), bytes);
        self
    }
}

impl ResourceResolver for MemoryResolver {
    fn image_bytes(&self, reference: &str) -> Result<Vec<u8>, ResourceError> {
        if let Some(bytes) = self.images.get(reference) {
            return Ok(bytes.clone());
        }
        if reference.starts_with("data:") {
            return decode_data_uri(reference);
        }
        Err(ResourceError::NotFound(reference.to_string()))
    }

    fn font(&self, family: &str) -> Result<FontFace, ResourceError> {
        let bytes = self
            .fonts
            .get(family)
            .ok_or_else(|| ResourceError::NotFound(family.to_string()))?;
        Ok(FontFace::from_vec(bytes.clone(), 0)?)
    }
}

/// Resolves nothing; every resource renders as a placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ResourceResolver for NullResolver {
    fn image_bytes(&self, reference: &str) -> Result<Vec<u8>, ResourceError> {
        Err(ResourceError::NotFound(reference.to_string()))
    }

    fn font(&self, family: &str) -> Result<FontFace, ResourceError> {
        Err(ResourceError::NotFound(family.to_string()))
    }
}

/// Resources of one scene, loaded once per unique reference. `None` entries
/// failed to load.
#[derive(Debug, Default)]
pub struct ResourceSet {
    images: HashMap<String, Option<ImageSource>>,
    fonts: HashMap<String, Option<Arc<FontFace>>>,
    default_family: String,
}

impl ResourceSet {
    /// Family used by text nodes that do not name one.
    pub const FALLBACK_FAMILY: &'static str = "sans-serif";

    pub fn preload(
        scene: &Scene,
        resolver: &dyn ResourceResolver,
        default_family: Option<&str>,
    ) -> Self {
        let mut set = Self {
            default_family: default_family
                .unwrap_or(Self::FALLBACK_FAMILY)
                .to_string(),
            ..Self::default()
        };
        scene.walk(|node| match &node.kind {
            NodeKind::Image(img) | NodeKind::Sticker(img) | NodeKind::Texture(img) => {
                if !set.images.contains_key(&img.src) {
                    let loaded = load_image(resolver, &img.src);
                    set.images.insert(img.src.clone(), loaded);
                }
            }
            NodeKind::Text(text) => {
                let family = text
                    .font
                    .family
                    .clone()
                    .unwrap_or_else(|| set.default_family.clone());
                if !set.fonts.contains_key(&family) {
                    let loaded = match resolver.font(&family) {
                        Ok(face) => Some(Arc::new(face)),
                        Err(error) => {
                            warn!(%family, %error, "font unavailable, using placeholders");
                            None
                        }
                    };
                    set.fonts.insert(family, loaded);
                }
            }
            _ => {}
        });
        debug!(
            images = set.images.len(),
            fonts = set.fonts.len(),
            "preloaded scene resources"
        );
        set
    }

    pub fn image(&self, reference: &str) -> Option<&ImageSource> {
        self.images.get(reference).and_then(Option::as_ref)
    }

    pub fn font(&self, family: &str) -> Option<&FontFace> {
        self.fonts
            .get(family)
            .and_then(Option::as_ref)
            .map(Arc::as_ref)
    }

    /// The family a text node with `family` actually asks for.
    pub fn family_or_default<'a>(&'a self, family: Option<&'a str>) -> &'a str {
        family.unwrap_or(&self.default_family)
    }
}

fn load_image(resolver: &dyn ResourceResolver, reference: &str) -> Option<ImageSource> {
    let result = resolver
        .image_bytes(reference)
        .and_then(|bytes| Ok(ImageSource::decode(bytes)?));
    match result {
        Ok(image) => Some(image),
        Err(error) => {
            warn!(reference = %truncate(reference), %error, "image unavailable, using placeholder");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageNode, SceneNode, TextNode};
    use engine_core::FilterSet;

    #[test]
    fn data_uris_decode_both_forms() {
        assert_eq!(decode_data_uri("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_data_uri("data:image/svg+xml,<svg/>").unwrap(), b"<svg/>");
        assert!(decode_data_uri("data:nocomma").is_err());
        assert!(decode_data_uri("data:x;base64,@@@").is_err());
    }

    #[test]
    fn asset_paths_prefer_root() {
        let dir = std::env::temp_dir().join(format!("rune-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("logo.png"), b"x").unwrap();
        assert_eq!(
            resolve_asset_path(Some(&dir), Path::new("logo.png")),
            Some(dir.join("logo.png"))
        );
        assert_eq!(resolve_asset_path(Some(&dir), Path::new("missing.png")), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn preload_records_failures_once() {
        let image = |id: &str, src: &str| {
            SceneNode::new(
                id,
                NodeKind::Image(ImageNode {
                    src: src.into(),
                    filters: FilterSet::default(),
                }),
            )
        };
        let mut scene = Scene::new(10.0, 10.0);
        scene.nodes.push(image("a", "missing.png"));
        scene.nodes.push(image("b", "missing.png"));
        scene.nodes.push(SceneNode::new(
            "t",
            NodeKind::Text(TextNode {
                text: "x".into(),
                font: Default::default(),
                fill: crate::model::Fill::solid(engine_core::Color::BLACK),
                align: Default::default(),
                warp: None,
                path_ref: None,
            }),
        ));
        let set = ResourceSet::preload(&scene, &NullResolver, Some("Brand"));
        assert_eq!(set.images.len(), 1);
        assert!(set.image("missing.png").is_none());
        assert!(set.font("Brand").is_none());
        assert!(set.fonts.contains_key("Brand"));
        assert_eq!(set.family_or_default(None), "Brand");
    }
}
