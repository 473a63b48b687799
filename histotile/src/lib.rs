//! Histotile - tissue classification and marker colocalization for tiled
//! microscopy scans.
//!
//! The library provides:
//! - Dominant-color tissue classification with spatial correction
//! - Stain separation and blur rejection of target tiles
//! - Two-sensitivity marker positivity masks
//! - Greedy colocalization of segmented cells with the marker
//! - Per-image aggregation of the counts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use histotile::{Analyzer, Config, PrecomputedSegmentation, Tile};
//!
//! let analyzer = Analyzer::from_config(Config::from_file("histotile.yaml".as_ref())?);
//! let report = analyzer.analyze_image(&tiles, &segmentation)?;
//!
//! println!("{report}");
//! ```

pub mod blur;
pub mod cells;
pub mod colocalization;
pub mod config;
pub(crate) mod dilation;
pub mod error;
pub(crate) mod labeling;
pub(crate) mod math;
pub mod pipeline;
pub mod positivity;
pub mod report;
pub mod segmentation;
pub mod stain;
pub mod tile;
pub mod tissue;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Tiles and rasters
// ============================================================================

pub use tile::{LabelRaster, RgbRaster, StainRaster, Tile};

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{
    BlurConfig, ColocalizationConfig, Config, Connectivity, KMeansConfig, PositivityConfig,
    SearchAxis, TissueConfig, VerticalSearchConfig,
};
pub use error::{DegenerateReason, Error, Result};

// ============================================================================
// Tissue classification
// ============================================================================

pub use tissue::{Direction, KMeansResult, TissueClassifier, TissueMap};

// ============================================================================
// Tile analysis
// ============================================================================

pub use blur::{BlurDetector, LaplacianBlurDetector};
pub use cells::CellTable;
pub use colocalization::{Colocalization, colocalize};
pub use positivity::{PositivityMask, SensitivityLevel, build_positivity_mask};
pub use segmentation::{CellSegmenter, PrecomputedSegmentation};
pub use stain::{HedSeparator, Stain, StainChannels, StainSeparator};

// ============================================================================
// Pipeline and report
// ============================================================================

pub use pipeline::{Analyzer, LevelAnalysis, TileAnalysis};
pub use report::{ImageReport, LevelCounts, TileCounts, TileOutcome};
