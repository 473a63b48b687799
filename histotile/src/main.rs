//! Analyze one tiled scan described by a manifest.
//!
//! # Usage
//!
//! ```bash
//! histotile <manifest.yaml> [config.yaml] [report.json]
//! ```
//!
//! The manifest lists every tile of the scan:
//!
//! ```yaml
//! tiles:
//!   - index: 0
//!     position: [1200.0, 3400.0]
//!     image: tiles/000.png
//!     labels: labels/000.png
//! ```
//!
//! `labels` is an 8- or 16-bit grayscale raster of cell identities and may be omitted
//! for tiles that have no segmentation. Relative paths are resolved against
//! the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::DVec2;
use histotile::{
    Analyzer, Config, LabelRaster, PrecomputedSegmentation, RgbRaster, SensitivityLevel, Tile,
};
use image::DynamicImage;
use serde::Deserialize;
use strum::IntoEnumIterator;

const USAGE: &str = "usage: histotile <manifest> [config] [report]";

#[derive(Debug, Deserialize)]
struct Manifest {
    tiles: Vec<ManifestTile>,
}

#[derive(Debug, Deserialize)]
struct ManifestTile {
    index: usize,
    position: [f64; 2],
    image: PathBuf,
    #[serde(default)]
    labels: Option<PathBuf>,
}

fn main() -> Result<()> {
    common::log_setup::setup_logging("info", "histotile");

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let manifest_path = args.next().context(USAGE)?;
    let config_path = args.next();
    let report_path = args.next();

    let config = match &config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let manifest: Manifest = common::load_file(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let (tiles, segmentation) = load_tiles(manifest, base_dir)?;
    tracing::info!(
        tiles = tiles.len(),
        segmented = segmentation.len(),
        "Manifest loaded"
    );

    let report = Analyzer::from_config(config).analyze_image(&tiles, &segmentation)?;

    println!("{report}");
    for level in SensitivityLevel::iter() {
        println!(
            "{level}: {} positive of {} cells",
            report.positive.get(level),
            report.total_cells
        );
    }

    if let Some(path) = report_path {
        report
            .save(&path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn load_tiles(
    mut manifest: Manifest,
    base_dir: &Path,
) -> Result<(Vec<Tile>, PrecomputedSegmentation)> {
    manifest.tiles.sort_by_key(|t| t.index);
    if let Some(pair) = manifest.tiles.windows(2).find(|w| w[0].index == w[1].index) {
        anyhow::bail!("tile index {} listed twice", pair[0].index);
    }

    let mut tiles = Vec::with_capacity(manifest.tiles.len());
    let mut segmentation = PrecomputedSegmentation::new();
    for entry in manifest.tiles {
        let raster = load_rgb(&base_dir.join(&entry.image))?;
        if let Some(labels) = &entry.labels {
            segmentation.insert(entry.index, load_labels(&base_dir.join(labels))?);
        }
        let [x, y] = entry.position;
        tiles.push(Tile::new(entry.index, DVec2::new(x, y), raster));
    }
    Ok((tiles, segmentation))
}

fn load_rgb(path: &Path) -> Result<RgbRaster> {
    let image = image::open(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .to_rgb8();
    let (width, height) = (image.width() as usize, image.height() as usize);
    let pixels = image.pixels().map(|p| p.0).collect();
    Ok(RgbRaster::new(width, height, pixels))
}

/// Read a grayscale label raster, keeping the stored values as identities.
///
/// Only 8- and 16-bit single-channel images are accepted; any conversion
/// would rescale or mix identities.
fn load_labels(path: &Path) -> Result<LabelRaster> {
    let image = image::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (width, height, pixels): (u32, u32, Vec<u32>) = match &image {
        DynamicImage::ImageLuma8(buf) => (
            buf.width(),
            buf.height(),
            buf.as_raw().iter().map(|&v| v as u32).collect(),
        ),
        DynamicImage::ImageLuma16(buf) => (
            buf.width(),
            buf.height(),
            buf.as_raw().iter().map(|&v| v as u32).collect(),
        ),
        other => anyhow::bail!(
            "{} is not a grayscale label raster (color type {:?})",
            path.display(),
            other.color()
        ),
    };
    Ok(LabelRaster::new(width as usize, height as usize, pixels))
}
