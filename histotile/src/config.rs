//! Configuration for tissue classification and colocalization analysis.
//!
//! [`Config`] groups one section per pipeline stage. Every field has a
//! default reproducing the reference protocol, and the whole struct can be
//! read from YAML or JSON with missing keys falling back to those defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// Enums
// ============================================================================

/// Pixel connectivity for connected component labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Only horizontal and vertical neighbors are connected.
    Four,
    /// Diagonal neighbors are connected too.
    #[default]
    Eight,
}

/// Physical axis along which the "above"/"below" neighbor search steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAxis {
    /// Step along the first coordinate; the second one is lateral.
    #[default]
    X,
    /// Step along the second coordinate; the first one is lateral.
    Y,
}

// ============================================================================
// Tissue classification
// ============================================================================

/// K-means settings for dominant-color extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Maximum Lloyd iterations per run.
    pub max_iterations: usize,
    /// Convergence tolerance, relative to the mean per-channel variance of the data.
    pub tolerance: f64,
    /// Independent k-means++ runs; the one with the lowest inertia wins.
    pub restarts: usize,
    /// Base seed. Each tile mixes in its index. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 1,
            seed: Some(0),
        }
    }
}

/// Dominant-color tissue classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TissueConfig {
    /// Fraction of darkest and of lightest pixels excluded before clustering.
    pub excluded_fraction: f64,
    /// Number of dominant colors.
    pub clusters: usize,
    /// A dominant color with `red - blue >= margin` is non-target matter.
    pub red_blue_margin: i32,
    pub kmeans: KMeansConfig,
    /// Cap on the number of informative pixels fed to k-means (evenly strided).
    /// `None` clusters every informative pixel.
    pub sample_limit: Option<usize>,
}

impl Default for TissueConfig {
    fn default() -> Self {
        Self {
            excluded_fraction: 0.2,
            clusters: 3,
            red_blue_margin: 25,
            kmeans: KMeansConfig::default(),
            sample_limit: None,
        }
    }
}

impl TissueConfig {
    pub fn validate(&self) {
        assert!(
            (0.0..0.5).contains(&self.excluded_fraction),
            "excluded_fraction must be in [0, 0.5), got {}",
            self.excluded_fraction
        );
        assert!(self.clusters > 0, "clusters must be positive");
        assert!(
            self.kmeans.max_iterations > 0,
            "kmeans.max_iterations must be positive"
        );
        assert!(self.kmeans.restarts > 0, "kmeans.restarts must be positive");
        assert!(
            self.kmeans.tolerance >= 0.0,
            "kmeans.tolerance must be non-negative, got {}",
            self.kmeans.tolerance
        );
        if let Some(limit) = self.sample_limit {
            assert!(
                limit >= self.clusters,
                "sample_limit ({limit}) must be >= clusters ({})",
                self.clusters
            );
        }
    }
}

/// Nearest-tile search used by the vertical correction pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalSearchConfig {
    pub axis: SearchAxis,
    /// Physical distance from a tile to its expected upper/lower neighbor.
    pub offset: f64,
    /// Candidates kept after ranking by distance to the offset point.
    pub window: usize,
    /// Reject the located neighbor when its axis error exceeds this distance.
    pub max_axis_error: Option<f64>,
}

impl Default for VerticalSearchConfig {
    fn default() -> Self {
        Self {
            axis: SearchAxis::X,
            offset: 1600.0,
            window: 1000,
            max_axis_error: None,
        }
    }
}

impl VerticalSearchConfig {
    pub fn validate(&self) {
        assert!(
            self.offset.is_finite() && self.offset > 0.0,
            "offset must be positive, got {}",
            self.offset
        );
        assert!(self.window > 0, "window must be positive");
        if let Some(max) = self.max_axis_error {
            assert!(max >= 0.0, "max_axis_error must be non-negative, got {max}");
        }
    }
}

// ============================================================================
// Positivity mask
// ============================================================================

/// Adaptive stain thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositivityConfig {
    /// Pixels at or above this intensity are background and excluded from the median.
    pub white_cutoff: f64,
    /// Lower bound for the median.
    pub median_floor: f64,
    pub narrow_multiplier: f64,
    pub broad_multiplier: f64,
    /// Components smaller than this many pixels are discarded as noise.
    pub min_component_area: usize,
    pub connectivity: Connectivity,
}

impl Default for PositivityConfig {
    fn default() -> Self {
        Self {
            white_cutoff: 0.9,
            median_floor: 0.87,
            narrow_multiplier: 0.7,
            broad_multiplier: 0.9,
            min_component_area: 20,
            connectivity: Connectivity::Eight,
        }
    }
}

impl PositivityConfig {
    pub fn validate(&self) {
        assert!(
            self.white_cutoff > 0.0 && self.white_cutoff <= 1.0,
            "white_cutoff must be in (0, 1], got {}",
            self.white_cutoff
        );
        assert!(
            (0.0..=1.0).contains(&self.median_floor),
            "median_floor must be in [0, 1], got {}",
            self.median_floor
        );
        assert!(
            self.narrow_multiplier > 0.0 && self.broad_multiplier > 0.0,
            "threshold multipliers must be positive"
        );
        assert!(
            self.narrow_multiplier <= self.broad_multiplier,
            "narrow_multiplier ({}) must be <= broad_multiplier ({})",
            self.narrow_multiplier,
            self.broad_multiplier
        );
    }
}

// ============================================================================
// Colocalization / blur
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColocalizationConfig {
    /// Dilation radius as a fraction of `sqrt(cell area)`.
    pub radius_fraction: f64,
}

impl Default for ColocalizationConfig {
    fn default() -> Self {
        Self {
            radius_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub enabled: bool,
    /// A tile is sharp when its Laplacian variance exceeds this value.
    pub variance_threshold: f64,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            variance_threshold: 80.0,
        }
    }
}

// ============================================================================
// Top level
// ============================================================================

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tissue: TissueConfig,
    pub vertical_search: VerticalSearchConfig,
    pub positivity: PositivityConfig,
    pub colocalization: ColocalizationConfig,
    pub blur: BlurConfig,
    /// Tiles analyzed concurrently. Bounds peak raster memory.
    pub max_concurrent_tiles: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tissue: TissueConfig::default(),
            vertical_search: VerticalSearchConfig::default(),
            positivity: PositivityConfig::default(),
            colocalization: ColocalizationConfig::default(),
            blur: BlurConfig::default(),
            max_concurrent_tiles: 8,
        }
    }
}

impl Config {
    /// Load a configuration from a `.yaml`/`.yml`/`.json` file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let config: Config = common::load_file(path)?;
        config.validate();
        Ok(config)
    }

    /// Panics on an inconsistent configuration.
    pub fn validate(&self) {
        self.tissue.validate();
        self.vertical_search.validate();
        self.positivity.validate();
        assert!(
            self.colocalization.radius_fraction >= 0.0,
            "radius_fraction must be non-negative, got {}",
            self.colocalization.radius_fraction
        );
        assert!(
            self.blur.variance_threshold >= 0.0,
            "variance_threshold must be non-negative, got {}",
            self.blur.variance_threshold
        );
        assert!(
            self.max_concurrent_tiles > 0,
            "max_concurrent_tiles must be positive"
        );
    }
}
