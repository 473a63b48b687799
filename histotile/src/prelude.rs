//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use histotile::prelude::*;
//! ```

// Tiles
pub use crate::{LabelRaster, RgbRaster, StainRaster, Tile};

// Configuration
pub use crate::{Config, Error, Result};

// Analysis - main API
pub use crate::{Analyzer, CellSegmenter, ImageReport, PrecomputedSegmentation, SensitivityLevel};

// Extension points
pub use crate::{BlurDetector, StainSeparator};
