//! Rune export configuration
//!
//! Settings come from `rune.toml` when present, otherwise from defaults, and
//! `RUNE_*` environment variables override either.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown export format `{0}` (expected png, jpeg, svg or pdf)")]
    UnknownFormat(String),
    #[error("unknown backend `{0}` (expected raster or vector)")]
    UnknownBackend(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RuneConfig {
    /// Default export profile
    pub export: ExportProfile,
    /// PDF page and metadata settings
    pub pdf: PdfConfig,
    /// Sampling and randomness settings
    pub rendering: RenderingConfig,
    /// Where images and fonts are looked up
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Raster,
    Vector,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" => Ok(Backend::Raster),
            "vector" => Ok(Backend::Vector),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Svg,
    Pdf,
}

impl ExportFormat {
    /// The backend that produces this format.
    pub fn backend(self) -> Backend {
        match self {
            ExportFormat::Svg => Backend::Vector,
            ExportFormat::Png | ExportFormat::Jpeg | ExportFormat::Pdf => Backend::Raster,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ExportFormat> for String {
    fn from(f: ExportFormat) -> String {
        f.to_string()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        })
    }
}

/// What to produce and how: backend, output format, raster DPI multiplier
/// and JPEG quality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportProfile {
    pub backend: Backend,
    pub format: ExportFormat,
    /// Physical pixels per scene unit (raster only)
    pub dpi_scale: f64,
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self {
            backend: Backend::Raster,
            format: ExportFormat::Png,
            dpi_scale: 3.0,
            quality: 92,
        }
    }
}

impl ExportProfile {
    /// Profile for `format` with its natural backend and default settings.
    pub fn for_format(format: ExportFormat) -> Self {
        Self {
            backend: format.backend(),
            format,
            ..Self::default()
        }
    }
}

/// PDF output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfConfig {
    /// Physical page width in inches
    pub page_width_in: f64,
    /// Physical page height in inches
    pub page_height_in: f64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

impl Default for PdfConfig {
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

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderingConfig {
    /// Arc-length samples for text on a path (at least 200 are used)
    pub curve_samples: usize,
    /// Line segments per curve when flattening for boolean operations
    pub flatten_steps: usize,
    /// Fixed seed for randomized patterns; clock-seeded when unset
    pub pattern_seed: Option<u64>,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            curve_samples: 200,
            flatten_steps: 16,
            pattern_seed: None,
        }
    }
}

/// Asset lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory relative image and font references resolve against
    pub root: Option<PathBuf>,
    /// Family used when a text node names none
    pub default_font: Option<String>,
}

impl RuneConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `rune.toml` from the current directory, or defaults if it is
    /// missing or unreadable
    pub fn load_or_default() -> Self {
        match Self::load_from_file("rune.toml") {
            Ok(config) => config,
            Err(ConfigError::Read { .. }) => Self::default(),
            Err(e) => {
                warn!("ignoring rune.toml: {e}");
                Self::default()
            }
        }
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Values that do not parse are ignored with a warning.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; `merge_with_env` uses the
    /// process environment.
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RUNE_EXPORT_FORMAT") {
            match val.parse::<ExportFormat>() {
                Ok(format) => {
                    self.export.format = format;
                    self.export.backend = format.backend();
                }
                Err(e) => warn!("RUNE_EXPORT_FORMAT: {e}"),
            }
        }
        if let Some(val) = lookup("RUNE_DPI_SCALE") {
            match val.parse::<f64>() {
                Ok(scale) => self.export.dpi_scale = scale,
                Err(_) => warn!("RUNE_DPI_SCALE: not a number: {val}"),
            }
        }
        if let Some(val) = lookup("RUNE_JPEG_QUALITY") {
            match val.parse::<u8>() {
                Ok(q) => self.export.quality = q.clamp(1, 100),
                Err(_) => warn!("RUNE_JPEG_QUALITY: not a quality: {val}"),
            }
        }
        if let Some(val) = lookup("RUNE_PATTERN_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.rendering.pattern_seed = Some(seed),
                Err(_) => warn!("RUNE_PATTERN_SEED: not a seed: {val}"),
            }
        }
        if let Some(val) = lookup("RUNE_CURVE_SAMPLES") {
            match val.parse::<usize>() {
                Ok(n) => self.rendering.curve_samples = n,
                Err(_) => warn!("RUNE_CURVE_SAMPLES: not a count: {val}"),
            }
        }
        if let Some(root) = lookup("RUNE_ASSET_ROOT") {
            self.assets.root = Some(PathBuf::from(root));
        }
        if let Some(title) = lookup("RUNE_PDF_TITLE") {
            self.pdf.title = Some(title);
        }
        if let Some(author) = lookup("RUNE_PDF_AUTHOR") {
            self.pdf.author = Some(author);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RuneConfig::default();
        assert_eq!(config.export.dpi_scale, 3.0);
        assert_eq!(config.export.format, ExportFormat::Png);
        assert_eq!(config.rendering.curve_samples, 200);
        assert_eq!(config.pdf.page_width_in, 8.5);
    }

    #[test]
    fn test_toml_serialization() {
        let config = RuneConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: RuneConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RuneConfig::from_toml(
            r#"
            [export]
            format = "JPG"
            quality = 70

            [rendering]
            pattern_seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.export.format, ExportFormat::Jpeg);
        assert_eq!(config.export.quality, 70);
        assert_eq!(config.export.dpi_scale, 3.0);
        assert_eq!(config.rendering.pattern_seed, Some(7));
        assert_eq!(config.rendering.flatten_steps, 16);
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        assert!(matches!(
            "tiff".parse::<ExportFormat>(),
            Err(ConfigError::UnknownFormat(f)) if f == "tiff"
        ));
        assert!(RuneConfig::from_toml("[export]\nformat = \"bmp\"").is_err());
        assert_eq!(" Svg ".parse::<ExportFormat>().unwrap(), ExportFormat::Svg);
    }

    #[test]
    fn test_load_or_default() {
        // Should not panic even if rune.toml doesn't exist
        let config = RuneConfig::load_or_default();
        assert!(config.export.quality >= 1);
    }

    #[test]
    fn test_merge_with_overrides() {
        let env: HashMap<&str, &str> = [
            ("RUNE_EXPORT_FORMAT", "svg"),
            ("RUNE_DPI_SCALE", "not-a-number"),
            ("RUNE_JPEG_QUALITY", "250"),
            ("RUNE_ASSET_ROOT", "/srv/assets"),
            ("RUNE_PDF_TITLE", "Flyer"),
        ]
        .into_iter()
        .collect();
        let mut config = RuneConfig::default();
        config.merge_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.export.format, ExportFormat::Svg);
        assert_eq!(config.export.backend, Backend::Vector);
        assert_eq!(config.export.dpi_scale, 3.0);
        // 250 does not fit in a u8, so the default stays.
        assert_eq!(config.export.quality, 92);
        assert_eq!(config.assets.root.as_deref(), Some(Path::new("/srv/assets")));
        assert_eq!(config.pdf.title.as_deref(), Some("Flyer"));
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("RUNE_PDF_AUTHOR", "Studio");
        }

        let mut config = RuneConfig::default();
        config.merge_with_env();
        assert_eq!(config.pdf.author.as_deref(), Some("Studio"));

        unsafe {
            std::env::remove_var("RUNE_PDF_AUTHOR");
        }
    }
}
