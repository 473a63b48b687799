//! Tile tissue classification by dominant color.
//!
//! Each tile's mid-intensity pixels are clustered into a few dominant colors.
//! A tile is target tissue when none of its dominant colors is reddish. The
//! per-tile decisions are then corrected against the index neighbors and the
//! physical neighbors, see [`correction`].


pub mod correction;
pub mod kmeans;

use glam::{DVec2, DVec3};
use rayon::prelude::*;

use crate::config::{TissueConfig, VerticalSearchConfig};
use crate::error::{DegenerateReason, Error, Result};
use crate::math::histogram_rank;
use crate::tile::{RgbRaster, Tile};

pub use correction::{Direction, VerticalPassStats};
pub use kmeans::{KMeansResult, kmeans};

/// 8-bit luma with the usual fixed-point BT.601 weights.
#[inline]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((4899 * r as u32 + 9617 * g as u32 + 1868 * b as u32 + (1 << 13)) >> 14) as u8
}

/// Inclusive luma band left after excluding `fraction` of the darkest and of
/// the lightest pixels. `None` for an empty raster.
pub fn luma_band(raster: &RgbRaster, fraction: f64) -> Option<(u8, u8)> {
    let n = raster.len();
    if n == 0 {
        return None;
    }

    let mut histogram = [0usize; 256];
    for &rgb in raster.iter() {
        histogram[luma(rgb) as usize] += 1;
    }

    let lower = histogram_rank(&histogram, (n as f64 * fraction) as usize);
    let upper = histogram_rank(&histogram, (n as f64 * (1.0 - fraction)) as usize);
    Some((lower, upper))
}

/// RGB vectors of the pixels inside the luma band.
pub fn informative_pixels(
    raster: &RgbRaster,
    config: &TissueConfig,
) -> std::result::Result<Vec<DVec3>, DegenerateReason> {
    let (lower, upper) =
        luma_band(raster, config.excluded_fraction).ok_or(DegenerateReason::EmptyRaster)?;

    let mut pixels: Vec<DVec3> = raster
        .iter()
        .filter(|&&rgb| (lower..=upper).contains(&luma(rgb)))
        .map(|&[r, g, b]| DVec3::new(r as f64, g as f64, b as f64))
        .collect();

    if let Some(limit) = config.sample_limit
        && pixels.len() > limit
    {
        let step = pixels.len() as f64 / limit as f64;
        pixels = (0..limit)
            .map(|i| pixels[(i as f64 * step) as usize])
            .collect();
    }

    if pixels.len() < config.clusters {
        return Err(DegenerateReason::TooFewInformativePixels {
            informative: pixels.len(),
            clusters: config.clusters,
        });
    }
    Ok(pixels)
}

/// Dominant colors of `raster`, truncated to integers.
pub fn dominant_colors(
    raster: &RgbRaster,
    config: &TissueConfig,
    seed: Option<u64>,
) -> std::result::Result<Vec<[i32; 3]>, DegenerateReason> {
    let pixels = informative_pixels(raster, config)?;
    let result = kmeans(&pixels, config.clusters, &config.kmeans, seed);
    Ok(result
        .centers
        .iter()
        .map(|c| [c.x as i32, c.y as i32, c.z as i32])
        .collect())
}

/// `true` when no color has `red - blue >= margin`.
pub fn classify_colors(colors: &[[i32; 3]], margin: i32) -> bool {
    colors.iter().all(|&[r, _, b]| r - b < margin)
}

// ============================================================================
// Classifier
// ============================================================================

/// Per-tile classes before and after correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TissueMap {
    /// Dominant-color decision per tile; `None` when unclassifiable.
    pub initial: Vec<Option<bool>>,
    /// Corrected classes. Unclassifiable tiles stay `false`.
    pub classes: Vec<bool>,
    pub horizontal_flips: usize,
    pub vertical_flips: usize,
    pub lookup_failures: usize,
    /// Tile indices that could not be classified.
    pub unclassifiable: Vec<usize>,
}

impl TissueMap {
    pub fn target_count(&self) -> usize {
        self.classes.iter().filter(|&&c| c).count()
    }

    #[inline]
    pub fn is_classifiable(&self, slot: usize) -> bool {
        self.initial[slot].is_some()
    }
}

/// Dominant-color tissue classifier with spatial correction.
#[derive(Debug, Clone)]
pub struct TissueClassifier {
    config: TissueConfig,
    search: VerticalSearchConfig,
}

impl TissueClassifier {
    pub fn new(config: TissueConfig, search: VerticalSearchConfig) -> Self {
        config.validate();
        search.validate();
        Self { config, search }
    }

    pub fn config(&self) -> &TissueConfig {
        &self.config
    }

    /// Seed for the clustering of tile `index`.
    fn tile_seed(&self, index: usize) -> Option<u64> {
        self.config.kmeans.seed.map(|s| s ^ index as u64)
    }

    /// Dominant-color decision for one tile, without correction.
    pub fn classify_tile(&self, tile: &Tile) -> Result<bool> {
        let colors = dominant_colors(&tile.raster, &self.config, self.tile_seed(tile.index))
            .map_err(|reason| Error::DegenerateInput {
                tile: tile.index,
                reason,
            })?;
        let target = classify_colors(&colors, self.config.red_blue_margin);
        tracing::debug!(tile = tile.index, ?colors, target, "Dominant colors");
        Ok(target)
    }

    /// Classify `tiles` (in index order) and apply both correction passes.
    pub fn classify_all(&self, tiles: &[Tile]) -> TissueMap {
        let initial: Vec<Option<bool>> = tiles
            .par_iter()
            .map(|tile| match self.classify_tile(tile) {
                Ok(target) => Some(target),
                Err(err) => {
                    tracing::warn!("{err}");
                    None
                }
            })
            .collect();

        self.correct(initial, tiles)
    }

    fn correct(&self, initial: Vec<Option<bool>>, tiles: &[Tile]) -> TissueMap {
        let positions: Vec<DVec2> = tiles.iter().map(|t| t.position).collect();
        let locked: Vec<bool> = initial.iter().map(Option::is_none).collect();
        let mut classes: Vec<bool> = initial.iter().map(|c| c.unwrap_or(false)).collect();

        let horizontal_flips = correction::horizontal_pass(&mut classes, &locked);
        let vertical = correction::vertical_pass(&mut classes, &locked, &positions, &self.search);

        let unclassifiable: Vec<usize> = tiles
            .iter()
            .zip(&locked)
            .filter(|(_, locked)| **locked)
            .map(|(tile, _)| tile.index)
            .collect();

        let map = TissueMap {
            initial,
            classes,
            horizontal_flips,
            vertical_flips: vertical.flips,
            lookup_failures: vertical.lookup_failures,
            unclassifiable,
        };
        tracing::debug!(
            tiles = tiles.len(),
            target = map.target_count(),
            horizontal_flips,
            vertical_flips = map.vertical_flips,
            lookup_failures = map.lookup_failures,
            "Tissue classification done"
        );
        map
    }
}
