use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use engine_core::{Color, ShapeKind};
use rune_config::{Backend, ExportFormat, ExportProfile, RuneConfig};
use rune_scene::{
    ExportError, ExportJob, Fill, ImageNode, MemoryResolver, NodeKind, NullResolver, Scene,
    SceneNode, ShapeNode, export, export_as, export_batch,
};

fn square(id: &str, x: f64, y: f64, size: f64, color: Color) -> SceneNode {
    SceneNode::new(
        id,
        NodeKind::Shape(ShapeNode {
            shape: ShapeKind::default(),
            fill: Some(Fill::solid(color)),
            stroke: None,
            pattern: None,
        }),
    )
    .at(x, y, size, size)
}

fn two_squares() -> Scene {
    let mut scene = Scene::new(20.0, 10.0);
    scene.nodes.push(square("red", 5.0, 0.0, 5.0, Color::rgb(255, 0, 0)));
    scene.nodes.push(square("blue", 7.0, 0.0, 5.0, Color::rgb(0, 0, 255)));
    scene
}

fn config() -> RuneConfig {
    let mut config = RuneConfig::default();
    config.rendering.pattern_seed = Some(1);
    config
}

fn raster(dpi_scale: f64) -> ExportProfile {
    ExportProfile {
        dpi_scale,
        ..ExportProfile::for_format(ExportFormat::Png)
    }
}

#[test]
fn png_is_scene_size_times_dpi() -> Result<()> {
    let out = export(&two_squares(), &raster(2.0), &NullResolver, &config())?;
    assert_eq!((out.width, out.height), (40, 20));

    let img = image::load_from_memory(&out.bytes)?.to_rgba8();
    assert_eq!(img.dimensions(), (40, 20));
    // Background, red, then blue painted over the overlap.
    assert_eq!(img.get_pixel(1, 18).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(11, 2).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(16, 2).0, [0, 0, 255, 255]);
    Ok(())
}

#[test]
fn transparent_export_leaves_background_out() -> Result<()> {
    let mut scene = two_squares();
    scene.include_background = false;
    let out = export(&scene, &raster(1.0), &NullResolver, &config())?;
    let img = image::load_from_memory(&out.bytes)?.to_rgba8();
    assert_eq!(img.get_pixel(0, 9).0[3], 0);
    Ok(())
}

#[test]
fn svg_declares_scene_viewbox_and_keeps_paint_order() -> Result<()> {
    let out = export_as(&two_squares(), "SVG", &NullResolver, &config())?;
    let svg = String::from_utf8(out.bytes)?;
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"width="20" height="10" viewBox="0 0 20 10""#));
    let red = svg.find("#ff0000").unwrap();
    let blue = svg.find("#0000ff").unwrap();
    assert!(red < blue);
    Ok(())
}

#[test]
fn invalid_requests_fail_without_output() {
    let cfg = config();
    let scene = two_squares();

    let err = export_as(&scene, "tiff", &NullResolver, &cfg).unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedFormat(f) if f == "tiff"));

    let flat = Scene::new(0.0, 10.0);
    let err = export(&flat, &raster(3.0), &NullResolver, &cfg).unwrap_err();
    assert!(matches!(err, ExportError::InvalidDimensions { .. }));

    let err = export(&scene, &raster(-1.0), &NullResolver, &cfg).unwrap_err();
    assert!(matches!(err, ExportError::InvalidDpiScale(_)));

    let mismatched = ExportProfile {
        backend: Backend::Vector,
        ..ExportProfile::for_format(ExportFormat::Png)
    };
    let err = export(&scene, &mismatched, &NullResolver, &cfg).unwrap_err();
    assert!(matches!(err, ExportError::BackendMismatch { .. }));
}

#[test]
fn missing_image_becomes_placeholder() -> Result<()> {
    let mut scene = Scene::new(10.0, 10.0);
    scene.nodes.push(
        SceneNode::new(
            "photo",
            NodeKind::Image(ImageNode {
                src: "photos/missing.png".into(),
                filters: Default::default(),
            }),
        )
        .at(0.0, 0.0, 10.0, 10.0),
    );
    let out = export(&scene, &raster(1.0), &NullResolver, &config())?;
    assert_eq!(out.stats.placeholders, 1);
    let img = image::load_from_memory(&out.bytes)?.to_rgba8();
    let c = Color::PLACEHOLDER;
    assert_eq!(img.get_pixel(5, 5).0, [c.r, c.g, c.b, 255]);
    Ok(())
}

#[test]
fn data_uri_images_are_drawn() -> Result<()> {
    let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 200, 0, 255]));
    let mut png = Vec::new();
    pixels.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
    let uri = format!("data:image/png;base64,{}", STANDARD.encode(&png));

    let mut scene = Scene::new(8.0, 8.0);
    scene.nodes.push(
        SceneNode::new(
            "tile",
            NodeKind::Texture(ImageNode {
                src: uri,
                filters: Default::default(),
            }),
        )
        .at(0.0, 0.0, 8.0, 8.0),
    );
    let out = export(&scene, &raster(1.0), &MemoryResolver::new(), &config())?;
    assert_eq!(out.stats.placeholders, 0);
    let img = image::load_from_memory(&out.bytes)?.to_rgba8();
    let [r, g, b, a] = img.get_pixel(5, 5).0;
    assert!(r <= 2 && b <= 2 && g.abs_diff(200) <= 2, "{r} {g} {b}");
    assert_eq!(a, 255);
    Ok(())
}

#[test]
fn jpeg_and_pdf_outputs_have_their_signatures() -> Result<()> {
    let scene = two_squares();
    let jpeg = export_as(&scene, "jpg", &NullResolver, &config())?;
    assert_eq!(&jpeg.bytes[..2], &[0xff, 0xd8]);

    let pdf = export_as(&scene, "pdf", &NullResolver, &config())?;
    assert!(pdf.bytes.starts_with(b"%PDF-"));
    Ok(())
}

#[test]
fn batch_keeps_job_order() {
    let good = ExportJob {
        scene: two_squares(),
        profile: raster(1.0),
    };
    let bad = ExportJob {
        scene: Scene::new(-1.0, 5.0),
        profile: raster(1.0),
    };
    let svg = ExportJob {
        scene: two_squares(),
        profile: ExportProfile::for_format(ExportFormat::Svg),
    };
    let results = export_batch(&[good, bad, svg], &NullResolver, &config());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().map(|o| o.format).ok(), Some(ExportFormat::Png));
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().map(|o| o.format).ok(), Some(ExportFormat::Svg));
}
