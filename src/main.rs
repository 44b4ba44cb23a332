//! rune-export: render scene documents to PNG, JPEG, SVG or PDF, and run
//! path boolean operations from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine_core::{BooleanEngine, BooleanOp, Region, path_codec};
use rune_config::{ExportFormat, RuneConfig};
use rune_scene::{FsResolver, Scene, export};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rune-export", version, about = "Render and export scene documents")]
struct Args {
    /// TOML config file; defaults to ./rune.toml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a scene JSON file
    Render {
        scene: PathBuf,

        /// Output file; defaults to the scene path with the format's extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// png, jpeg, svg or pdf; inferred from --output when omitted
        #[arg(short, long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Raster pixels per scene unit
        #[arg(long)]
        dpi: Option<f64>,

        /// Fixed seed for randomized patterns
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Combine closed paths and print the result as path data
    Boolean {
        #[arg(value_parser = parse_op)]
        op: BooleanOp,

        /// Path strings, applied left to right
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },
    /// Normalize path data through the anchor model
    EncodePath { d: String },
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_op(s: &str) -> Result<BooleanOp, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn load_config(path: Option<&Path>) -> Result<RuneConfig> {
    let mut config = match path {
        Some(path) => RuneConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RuneConfig::load_or_default(),
    };
    config.merge_with_env();
    Ok(config)
}

fn render(
    config: &mut RuneConfig,
    scene_path: &Path,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    dpi: Option<f64>,
    seed: Option<u64>,
) -> Result<()> {
    let json = std::fs::read_to_string(scene_path)
        .with_context(|| format!("reading scene {}", scene_path.display()))?;
    let scene = Scene::from_json(&json)
        .with_context(|| format!("parsing scene {}", scene_path.display()))?;

    let inferred = output
        .as_deref()
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<ExportFormat>().ok());
    let format = format.or(inferred).unwrap_or(config.export.format);
    let mut profile = config.export;
    profile.format = format;
    profile.backend = format.backend();
    if let Some(dpi) = dpi {
        profile.dpi_scale = dpi;
    }
    if seed.is_some() {
        config.rendering.pattern_seed = seed;
    }
    let output = output.unwrap_or_else(|| scene_path.with_extension(format.extension()));

    let resolver = FsResolver::new(config.assets.root.clone());
    let out = export(&scene, &profile, &resolver, config)
        .with_context(|| format!("exporting {}", scene_path.display()))?;
    std::fs::write(&output, &out.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        output = %output.display(),
        %format,
        width = out.width,
        height = out.height,
        bytes = out.bytes.len(),
        placeholders = out.stats.placeholders,
        "export complete"
    );
    Ok(())
}

/// Fold `op` over the path strings. An empty region is a valid result and
/// comes back as an empty path string.
fn combine(config: &RuneConfig, op: BooleanOp, paths: &[String]) -> Result<String> {
    let regions: Vec<Region> = paths.iter().map(|d| Region::from_path_string(d)).collect();
    let engine = BooleanEngine::new(config.rendering.flatten_steps);
    let result = engine
        .fold(&regions, op)
        .with_context(|| format!("{op} of {} paths", regions.len()))?;
    if result.is_empty() {
        info!(%op, "result is an empty region");
        return Ok(String::new());
    }
    Ok(result.to_path_string())
}

fn boolean(config: &RuneConfig, op: BooleanOp, paths: &[String]) -> Result<()> {
    println!("{}", combine(config, op, paths)?);
    Ok(())
}

fn encode_path(d: &str) -> Result<()> {
    let subpaths = path_codec::parse(d).context("parsing path data")?;
    println!("{}", path_codec::encode_subpaths(&subpaths));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Render {
            scene,
            output,
            format,
            dpi,
            seed,
        } => render(&mut config, &scene, output, format, dpi, seed),
        Command::Boolean { op, paths } => boolean(&config, op, &paths),
        Command::EncodePath { d } => encode_path(&d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(ds: &[&str]) -> Vec<String> {
        ds.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn empty_boolean_result_is_not_an_error() -> Result<()> {
        let square = "M0 0 L10 0 L10 10 L0 10 Z";
        let out = combine(&RuneConfig::default(), BooleanOp::Exclude, &paths(&[square, square]))?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn union_of_disjoint_squares_prints_both() -> Result<()> {
        let out = combine(
            &RuneConfig::default(),
            BooleanOp::Union,
            &paths(&["M0 0 L1 0 L1 1 L0 1 Z", "M5 5 L6 5 L6 6 L5 6 Z"]),
        )?;
        assert_eq!(out.matches('M').count(), 2);
        Ok(())
    }

    #[test]
    fn single_operand_fails() {
        let err = combine(
            &RuneConfig::default(),
            BooleanOp::Union,
            &paths(&["M0 0 L1 0 L1 1 Z"]),
        );
        assert!(err.is_err());
    }
}
