//! Resolution helpers shared by the raster and PDF outputs.
//!
//! Scenes are authored in logical pixels; exports multiply by a DPI scale.
//! Callers validate the scale themselves, these helpers only sanitize.

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// A usable multiplier: non-finite or non-positive values fall back to 1.
#[inline]
pub fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}

/// Physical pixel size of a logical `width`×`height` canvas, rounded up so
/// fractional canvases are never cropped. `None` if either side is empty or
/// the result does not fit in `u32`.
pub fn physical_size(width: f64, height: f64, scale: f64) -> Option<(u32, u32)> {
    let s = sanitize_scale(scale);
    let to_px = |v: f64| {
        let px = (v * s).ceil();
        (px >= 1.0 && px <= u32::MAX as f64).then_some(px as u32)
    };
    Some((to_px(width)?, to_px(height)?))
}

#[inline]
pub fn inches_to_points(inches: f64) -> f64 {
    inches * POINTS_PER_INCH
}

/// Largest rectangle with the image's aspect ratio that fits in the page,
/// centered. Returns `(x, y, w, h)` in page units.
pub fn fit_centered(image_w: f64, image_h: f64, page_w: f64, page_h: f64) -> (f64, f64, f64, f64) {
    if image_w <= 0.0 || image_h <= 0.0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let k = (page_w / image_w).min(page_h / image_h);
    let (w, h) = (image_w * k, image_h * k);
    ((page_w - w) * 0.5, (page_h - h) * 0.5, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_size_scales_and_rounds_up() {
        assert_eq!(physical_size(100.0, 50.0, 3.0), Some((300, 150)));
        assert_eq!(physical_size(10.2, 10.0, 1.0), Some((11, 10)));
        assert_eq!(physical_size(0.0, 10.0, 3.0), None);
        assert_eq!(physical_size(-5.0, 10.0, 3.0), None);
    }

    #[test]
    fn bad_scale_falls_back_to_one() {
        assert_eq!(sanitize_scale(f64::NAN), 1.0);
        assert_eq!(sanitize_scale(-2.0), 1.0);
    }

    #[test]
    fn fit_centered_letterboxes() {
        let (x, y, w, h) = fit_centered(200.0, 100.0, 612.0, 792.0);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(w, 612.0));
        assert!(close(h, 306.0));
        assert!(close(x, 0.0));
        assert!(close(y, 243.0));
    }
}
