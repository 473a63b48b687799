//! Per-image aggregation of tile results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::positivity::SensitivityLevel;

/// A count per sensitivity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub narrow: usize,
    pub broad: usize,
}

impl LevelCounts {
    pub fn get(&self, level: SensitivityLevel) -> usize {
        match level {
            SensitivityLevel::Narrow => self.narrow,
            SensitivityLevel::Broad => self.broad,
        }
    }

    fn add(&mut self, other: &LevelCounts) {
        self.narrow += other.narrow;
        self.broad += other.broad;
    }
}

/// Per-tile breakdown: positive cells per level and total cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCounts {
    pub positive: LevelCounts,
    pub cells: usize,
}

/// What happened to one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Dominant-color clustering was impossible.
    Unclassifiable,
    /// Classified as non-target tissue.
    Skipped,
    Blurry,
    Analyzed {
        counts: TileCounts,
        /// Levels whose threshold fell back to the median floor (0 or 1 each).
        floor_applied: LevelCounts,
    },
}

/// Aggregate counts of one image.
///
/// Every recorded tile gets a row in `tiles`; tiles that were not analyzed
/// have zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReport {
    pub tile_count: usize,
    pub skipped_tiles: Vec<usize>,
    pub blurry_tiles: Vec<usize>,
    pub unclassifiable_tiles: Vec<usize>,
    pub total_cells: usize,
    pub positive: LevelCounts,
    /// Analyzed tiles whose threshold used the median floor, per level.
    pub floor_applied: LevelCounts,
    pub tiles: BTreeMap<usize, TileCounts>,
}

impl ImageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyzed_tiles(&self) -> usize {
        self.tile_count
            - self.skipped_tiles.len()
            - self.blurry_tiles.len()
            - self.unclassifiable_tiles.len()
    }

    /// Record the outcome of tile `index`.
    ///
    /// # Panics
    ///
    /// Panics if the tile was already recorded.
    pub fn record(&mut self, index: usize, outcome: TileOutcome) {
        let counts = match outcome {
            TileOutcome::Unclassifiable => {
                insert_sorted(&mut self.unclassifiable_tiles, index);
                TileCounts::default()
            }
            TileOutcome::Skipped => {
                insert_sorted(&mut self.skipped_tiles, index);
                TileCounts::default()
            }
            TileOutcome::Blurry => {
                insert_sorted(&mut self.blurry_tiles, index);
                TileCounts::default()
            }
            TileOutcome::Analyzed {
                counts,
                floor_applied,
            } => {
                self.total_cells += counts.cells;
                self.positive.add(&counts.positive);
                self.floor_applied.add(&floor_applied);
                counts
            }
        };

        let previous = self.tiles.insert(index, counts);
        assert!(previous.is_none(), "tile {index} recorded twice");
        self.tile_count += 1;
    }

    /// Fold another partial report into this one. Order of merging does not matter.
    ///
    /// # Panics
    ///
    /// Panics if both reports contain the same tile.
    pub fn merge(&mut self, other: ImageReport) {
        self.tile_count += other.tile_count;
        self.total_cells += other.total_cells;
        self.positive.add(&other.positive);
        self.floor_applied.add(&other.floor_applied);

        for index in other.skipped_tiles {
            insert_sorted(&mut self.skipped_tiles, index);
        }
        for index in other.blurry_tiles {
            insert_sorted(&mut self.blurry_tiles, index);
        }
        for index in other.unclassifiable_tiles {
            insert_sorted(&mut self.unclassifiable_tiles, index);
        }
        for (index, counts) in other.tiles {
            let previous = self.tiles.insert(index, counts);
            assert!(previous.is_none(), "tile {index} present in both reports");
        }
    }

    /// Write the report as YAML or JSON, chosen by the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        common::save_file(self, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(common::load_file(path)?)
    }
}

fn insert_sorted(indices: &mut Vec<usize>, index: usize) {
    let pos = indices.partition_point(|&i| i < index);
    indices.insert(pos, index);
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tiles: {} ({} analyzed, {} skipped, {} blurry, {} unclassifiable)",
            self.tile_count,
            self.analyzed_tiles(),
            self.skipped_tiles.len(),
            self.blurry_tiles.len(),
            self.unclassifiable_tiles.len()
        )?;
        writeln!(f, "cells: {}", self.total_cells)?;
        write!(
            f,
            "positive cells: {} narrow, {} broad",
            self.positive.narrow, self.positive.broad
        )
    }
}
