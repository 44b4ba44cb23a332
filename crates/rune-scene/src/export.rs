//! Export entry points: validate a profile, render into the right backend
//! and encode. Output bytes are only returned once fully encoded.

use rayon::prelude::*;
use rune_config::{Backend, ExportFormat, ExportProfile, RuneConfig};
use rune_surface::{Canvas, PdfOptions, SurfaceError, SvgDocument};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::Scene;
use crate::render::{RenderOptions, RenderStats, render_scene};
use crate::resources::{ResourceResolver, ResourceSet};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("scene size {width}x{height} must be positive and finite")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("unsupported export format `{0}`")]
    UnsupportedFormat(String),
    #[error("{format} output needs the {expected:?} backend, profile asks for {requested:?}")]
    BackendMismatch {
        format: ExportFormat,
        expected: Backend,
        requested: Backend,
    },
    #[error("dpi scale {0} must be positive and finite")]
    InvalidDpiScale(f64),
    #[error("cannot create render surface: {0}")]
    Surface(#[source] SurfaceError),
    #[error("encoding failed: {0}")]
    Encode(#[source] SurfaceError),
}

#[derive(Clone, Debug)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Pixel size for raster output, scene size for SVG.
    pub width: u32,
    pub height: u32,
    pub stats: RenderStats,
}

/// One scene and how to export it, for [`export_batch`].
#[derive(Clone, Debug)]
pub struct ExportJob {
    pub scene: Scene,
    pub profile: ExportProfile,
}

fn validate(scene: &Scene, profile: &ExportProfile) -> Result<(), ExportError> {
    let ok = |v: f64| v.is_finite() && v > 0.0;
    if !ok(scene.width) || !ok(scene.height) {
        return Err(ExportError::InvalidDimensions {
            width: scene.width,
            height: scene.height,
        });
    }
    let expected = profile.format.backend();
    if profile.backend != expected {
        return Err(ExportError::BackendMismatch {
            format: profile.format,
            expected,
            requested: profile.backend,
        });
    }
    if expected == Backend::Raster && !ok(profile.dpi_scale) {
        return Err(ExportError::InvalidDpiScale(profile.dpi_scale));
    }
    Ok(())
}

/// Render and encode `scene`. Fails before drawing anything if the scene
/// size, backend or DPI scale is unusable.
pub fn export(
    scene: &Scene,
    profile: &ExportProfile,
    resolver: &dyn ResourceResolver,
    config: &RuneConfig,
) -> Result<ExportOutput, ExportError> {
    validate(scene, profile)?;
    let resources = ResourceSet::preload(scene, resolver, config.assets.default_font.as_deref());
    let options = RenderOptions::from(&config.rendering);

    let output = match profile.format {
        ExportFormat::Svg => {
            let mut doc = SvgDocument::new(scene.width, scene.height);
            let stats = render_scene(scene, &mut doc, &resources, &options);
            ExportOutput {
                format: profile.format,
                bytes: doc.finish().into_bytes(),
                width: scene.width.ceil() as u32,
                height: scene.height.ceil() as u32,
                stats,
            }
        }
        format => {
            let mut canvas = Canvas::new(scene.width, scene.height, profile.dpi_scale)
                .map_err(ExportError::Surface)?;
            let stats = render_scene(scene, &mut canvas, &resources, &options);
            let image = canvas.finish();
            let bytes = match format {
                ExportFormat::Jpeg => rune_surface::encode_jpeg(&image, profile.quality),
                ExportFormat::Pdf => rune_surface::encode_pdf(&image, &pdf_options(config)),
                _ => rune_surface::encode_png(&image),
            }
            .map_err(ExportError::Encode)?;
            ExportOutput {
                format,
                bytes,
                width: image.width,
                height: image.height,
                stats,
            }
        }
    };
    debug!(
        format = %output.format,
        width = output.width,
        height = output.height,
        bytes = output.bytes.len(),
        "exported scene"
    );
    Ok(output)
}

/// [`export`] with the configured default profile and `format` parsed from
/// text (`png`, `jpeg`/`jpg`, `svg`, `pdf`).
pub fn export_as(
    scene: &Scene,
    format: &str,
    resolver: &dyn ResourceResolver,
    config: &RuneConfig,
) -> Result<ExportOutput, ExportError> {
    let format: ExportFormat = format
        .parse()
        .map_err(|_| ExportError::UnsupportedFormat(format.to_string()))?;
    let profile = ExportProfile {
        backend: format.backend(),
        format,
        ..config.export
    };
    export(scene, &profile, resolver, config)
}

/// Export independent jobs in parallel; results keep the job order.
pub fn export_batch(
    jobs: &[ExportJob],
    resolver: &dyn ResourceResolver,
    config: &RuneConfig,
) -> Vec<Result<ExportOutput, ExportError>> {
    info!(jobs = jobs.len(), "starting batch export");
    jobs.par_iter()
        .map(|job| export(&job.scene, &job.profile, resolver, config))
        .collect()
}

fn pdf_options(config: &RuneConfig) -> PdfOptions {
    PdfOptions {
        page_width_in: config.pdf.page_width_in,
        page_height_in: config.pdf.page_height_in,
        title: config.pdf.title.clone(),
        author: config.pdf.author.clone(),
        subject: config.pdf.subject.clone(),
    }
}
