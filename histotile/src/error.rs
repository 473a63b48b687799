//! Error types for tile analysis.

use thiserror::Error;

/// Why a tile raster cannot be clustered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// The raster has no pixels.
    EmptyRaster,
    /// Fewer informative pixels than requested clusters.
    TooFewInformativePixels { informative: usize, clusters: usize },
}

impl std::fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegenerateReason::EmptyRaster => write!(f, "raster is empty"),
            DegenerateReason::TooFewInformativePixels {
                informative,
                clusters,
            } => write!(
                f,
                "{informative} informative pixels, need at least {clusters}"
            ),
        }
    }
}

/// Errors that can occur during tile analysis.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Tile {tile} cannot be classified: {reason}")]
    DegenerateInput {
        tile: usize,
        reason: DegenerateReason,
    },

    #[error("Cell {label} is present in the segmentation raster but has no area entry")]
    UnmatchedCellIdentity { label: u32 },

    #[error("Segmentation of tile {tile} failed: {source}")]
    Segmentation {
        tile: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Serialization(#[from] common::SerdeFormatError),
}

pub type Result<T> = std::result::Result<T, Error>;
