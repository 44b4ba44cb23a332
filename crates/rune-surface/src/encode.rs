//! Output encoders: PNG and JPEG from a raster render, and a single-page PDF
//! wrapping a raster render at print size.

use engine_core::dpi;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};

use crate::canvas::RasterImage;
use crate::error::Result;

/// JPEG quality of the image embedded in PDF documents.
const PDF_IMAGE_QUALITY: u8 = 95;

pub fn encode_png(image: &RasterImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        &image.pixels,
        image.width,
        image.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

/// Composite over white; JPEG has no alpha channel.
fn flatten_on_white(image: &RasterImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.pixels.len() / 4 * 3);
    for px in image.pixels.chunks_exact(4) {
        let a = px[3] as u32;
        for &c in &px[..3] {
            rgb.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
        }
    }
    rgb
}

pub fn encode_jpeg(image: &RasterImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let rgb = flatten_on_white(image);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
        &rgb,
        image.width,
        image.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[derive(Clone, Debug, PartialEq)]
pub struct PdfOptions {
    pub page_width_in: f64,
    pub page_height_in: f64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_width_in: 8.5,
            page_height_in: 11.0,
            title: None,
            author: None,
            subject: None,
        }
    }
}

/// One page of `page_width_in`×`page_height_in` inches with `image` fitted
/// and centered on it.
pub fn encode_pdf(image: &RasterImage, options: &PdfOptions) -> Result<Vec<u8>> {
    let jpeg = encode_jpeg(image, PDF_IMAGE_QUALITY)?;

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let image_id = Ref::new(4);
    let content_id = Ref::new(5);
    let info_id = Ref::new(6);
    let image_name = Name(b"Im1");

    let page_w = dpi::inches_to_points(options.page_width_in);
    let page_h = dpi::inches_to_points(options.page_height_in);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, page_w as f32, page_h as f32));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources().x_objects().pair(image_name, image_id);
    page.finish();

    let mut xobject = pdf.image_xobject(image_id, &jpeg);
    xobject.filter(Filter::DctDecode);
    xobject.width(image.width as i32);
    xobject.height(image.height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    xobject.finish();

    let (x, y, w, h) = dpi::fit_centered(image.width as f64, image.height as f64, page_w, page_h);
    let mut content = Content::new();
    content.save_state();
    content.transform([w as f32, 0.0, 0.0, h as f32, x as f32, y as f32]);
    content.x_object(image_name);
    content.restore_state();
    pdf.stream(content_id, &content.finish());

    let mut info = pdf.document_info(info_id);
    if let Some(title) = &options.title {
        info.title(TextStr(title));
    }
    if let Some(author) = &options.author {
        info.author(TextStr(author));
    }
    if let Some(subject) = &options.subject {
        info.subject(TextStr(subject));
    }
    info.creator(TextStr("rune-export"));
    info.finish();

    Ok(pdf.finish())
}
