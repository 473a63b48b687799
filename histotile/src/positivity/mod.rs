//! Adaptive stain thresholding into a positive-region mask.
//!
//! The threshold follows the tile's own background: the median intensity of
//! the non-white pixels, floored at [`PositivityConfig::median_floor`], is
//! scaled by the multiplier of the requested [`SensitivityLevel`]. Small
//! components are removed as noise.


use common::{BitBuffer2, Buffer2};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::config::PositivityConfig;
use crate::labeling::LabelMap;
use crate::math::median_f64_mut;
use crate::tile::StainRaster;

/// Threshold sensitivity. Each level yields its own, independent mask.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    /// Low threshold; only strongly stained regions.
    Narrow,
    /// High threshold; fainter staining counts too.
    Broad,
}

impl SensitivityLevel {
    pub fn multiplier(self, config: &PositivityConfig) -> f64 {
        match self {
            SensitivityLevel::Narrow => config.narrow_multiplier,
            SensitivityLevel::Broad => config.broad_multiplier,
        }
    }
}

/// Thresholded mask of one tile at one sensitivity level.
#[derive(Debug, Clone)]
pub struct PositivityMask {
    pub level: SensitivityLevel,
    pub mask: BitBuffer2,
    /// Median used for the threshold, after flooring.
    pub median: f64,
    pub threshold: f64,
    /// The measured median was below the floor (or missing) and was replaced.
    pub floor_applied: bool,
    pub components_kept: usize,
    pub components_discarded: usize,
}

/// Grayscale intensity of a stain raster.
pub fn grayscale(raster: &StainRaster) -> Buffer2<f64> {
    raster.map(|&[r, g, b]| 0.2989 * r as f64 + 0.5870 * g as f64 + 0.1140 * b as f64)
}

/// Build the positivity mask of `raster` at `level`.
pub fn build_positivity_mask(
    raster: &StainRaster,
    level: SensitivityLevel,
    config: &PositivityConfig,
) -> PositivityMask {
    let gray = grayscale(raster);

    let mut stained: Vec<f64> = gray
        .iter()
        .copied()
        .filter(|&v| v < config.white_cutoff)
        .collect();
    let (median, floor_applied) = match median_f64_mut(&mut stained) {
        Some(m) if m >= config.median_floor => (m, false),
        _ => (config.median_floor, true),
    };
    if floor_applied {
        tracing::debug!(
            %level,
            stained_pixels = stained.len(),
            floor = config.median_floor,
            "Threshold floor applied"
        );
    }

    let threshold = median * level.multiplier(config);
    let raw = BitBuffer2::from_fn(gray.width(), gray.height(), |x, y| gray[(x, y)] < threshold);

    let labels = LabelMap::from_mask(&raw, config.connectivity);
    let (mask, components_kept) = labels.retain_min_area(config.min_component_area);
    let components_discarded = labels.num_labels() - components_kept;

    tracing::debug!(
        %level,
        median,
        threshold,
        components_kept,
        components_discarded,
        "Built positivity mask"
    );

    PositivityMask {
        level,
        mask,
        median,
        threshold,
        floor_applied,
        components_kept,
        components_discarded,
    }
}
