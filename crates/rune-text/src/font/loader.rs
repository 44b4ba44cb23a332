use std::path::Path;

use fontdb::{Database, Family, Query};
use tracing::debug;

use crate::font::{FontError, FontFace, Result};

/// Family-name lookup over system fonts and extra font directories.
pub struct FontLibrary {
    db: Database,
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontLibrary {
    /// No fonts at all; every lookup fails.
    pub fn empty() -> Self {
        Self { db: Database::new() }
    }

    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "loaded system fonts");
        Self { db }
    }

    pub fn load_dir(&mut self, dir: impl AsRef<Path>) {
        self.db.load_fonts_dir(dir);
    }

    pub fn load_bytes(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Load the best face for `family`. Generic names (`serif`, `sans-serif`,
    /// `monospace`) map to fontdb's generic families.
    pub fn load_family(&self, family: &str) -> Result<FontFace> {
        let generic = match family.trim().to_ascii_lowercase().as_str() {
            "serif" => Some(Family::Serif),
            "sans-serif" | "sans" => Some(Family::SansSerif),
            "monospace" => Some(Family::Monospace),
            "cursive" => Some(Family::Cursive),
            "fantasy" => Some(Family::Fantasy),
            _ => None,
        };
        let named = [Family::Name(family.trim())];
        let families: &[Family<'_>] = match &generic {
            Some(g) => std::slice::from_ref(g),
            None => &named,
        };
        let id = self
            .db
            .query(&Query {
                families,
                ..Query::default()
            })
            .ok_or_else(|| FontError::NotFound(family.to_string()))?;
        self.db
            .with_face_data(id, |data, index| FontFace::from_vec(data.to_vec(), index as usize))
            .ok_or_else(|| FontError::NotFound(family.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_library_reports_missing_family() {
        let lib = FontLibrary::empty();
        assert!(lib.is_empty());
        assert!(matches!(
            lib.load_family("Helvetica"),
            Err(FontError::NotFound(name)) if name == "Helvetica"
        ));
    }
}
