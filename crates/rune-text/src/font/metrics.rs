/// Font-level metrics in font units.
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    /// Ascent above baseline (positive).
    pub ascent: f32,
    /// Descent below baseline (positive).
    pub descent: f32,
    /// Line gap (leading).
    pub line_gap: f32,
    pub units_per_em: u16,
}

impl FontMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }

    /// Font units to pixels for a given px-per-em size.
    pub fn unit_scale(&self, font_size: f32) -> f32 {
        if self.units_per_em != 0 {
            font_size / self.units_per_em as f32
        } else {
            1.0
        }
    }

    pub fn scale_to_pixels(&self, font_size: f32) -> ScaledFontMetrics {
        let scale = self.unit_scale(font_size);
        ScaledFontMetrics {
            ascent: self.ascent * scale,
            descent: self.descent * scale,
            line_gap: self.line_gap * scale,
            font_size,
        }
    }
}

/// Scaled font metrics in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledFontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub font_size: f32,
}

impl ScaledFontMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }
}
