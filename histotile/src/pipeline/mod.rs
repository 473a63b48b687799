//! End-to-end analysis of a tiled image.
//!
//! 1. Classify every tile and correct the classes spatially.
//! 2. Skip non-target and unclassifiable tiles.
//! 3. Skip blurry tiles.
//! 4. Separate stains, build one positivity mask per sensitivity level.
//! 5. Segment cells and colocalize them with each mask.
//! 6. Record per-tile counts into an [`ImageReport`].

#[cfg(test)]
mod tests;

use anyhow::anyhow;

use crate::blur::{BlurDetector, LaplacianBlurDetector};
use crate::cells::CellTable;
use crate::colocalization::{Colocalization, colocalize};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::positivity::{PositivityMask, SensitivityLevel, build_positivity_mask};
use crate::report::{ImageReport, LevelCounts, TileCounts, TileOutcome};
use crate::segmentation::CellSegmenter;
use crate::stain::{HedSeparator, StainSeparator};
use crate::tile::{LabelRaster, StainRaster, Tile};
use crate::tissue::{TissueClassifier, TissueMap};

/// Results of one sensitivity level of one tile.
#[derive(Debug, Clone)]
pub struct LevelAnalysis {
    /// The thresholded mask as built, before colocalization consumed it.
    pub positivity: PositivityMask,
    pub colocalization: Colocalization,
}

/// Everything computed for one analyzed tile.
#[derive(Debug, Clone)]
pub struct TileAnalysis {
    pub index: usize,
    pub cells: CellTable,
    pub narrow: LevelAnalysis,
    pub broad: LevelAnalysis,
}

impl TileAnalysis {
    pub fn level(&self, level: SensitivityLevel) -> &LevelAnalysis {
        match level {
            SensitivityLevel::Narrow => &self.narrow,
            SensitivityLevel::Broad => &self.broad,
        }
    }

    pub fn counts(&self) -> TileCounts {
        TileCounts {
            positive: LevelCounts {
                narrow: self.narrow.colocalization.positive_count(),
                broad: self.broad.colocalization.positive_count(),
            },
            cells: self.cells.cell_count(),
        }
    }

    pub fn floor_applied(&self) -> LevelCounts {
        LevelCounts {
            narrow: self.narrow.positivity.floor_applied as usize,
            broad: self.broad.positivity.floor_applied as usize,
        }
    }
}

/// Tile classification and colocalization analysis.
pub struct Analyzer {
    config: Config,
    classifier: TissueClassifier,
    stain_separator: Box<dyn StainSeparator>,
    blur_detector: Box<dyn BlurDetector>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Create an analyzer with default configuration.
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Create an analyzer with custom configuration.
    pub fn from_config(config: Config) -> Self {
        config.validate();
        let classifier = TissueClassifier::new(config.tissue, config.vertical_search);
        let blur_detector = LaplacianBlurDetector {
            variance_threshold: config.blur.variance_threshold,
        };
        Self {
            config,
            classifier,
            stain_separator: Box::new(HedSeparator::default()),
            blur_detector: Box::new(blur_detector),
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn with_stain_separator(mut self, separator: impl StainSeparator + 'static) -> Self {
        self.stain_separator = Box::new(separator);
        self
    }

    pub fn with_blur_detector(mut self, detector: impl BlurDetector + 'static) -> Self {
        self.blur_detector = Box::new(detector);
        self
    }

    /// Classify `tiles` and store the corrected class on each tile.
    pub fn classify_tiles(&self, tiles: &[Tile]) -> TissueMap {
        let map = self.classifier.classify_all(tiles);
        for (tile, &target) in tiles.iter().zip(&map.classes) {
            if !tile.set_target(target) {
                tracing::debug!(tile = tile.index, "Tissue class already set, keeping it");
            }
        }
        map
    }

    /// Analyze one target tile: positivity masks, segmentation, colocalization.
    pub fn analyze_tile(&self, tile: &Tile, segmenter: &dyn CellSegmenter) -> Result<TileAnalysis> {
        let channels = self.stain_separator.separate(&tile.raster);

        let labels = segmenter
            .segment(tile, &channels.nuclear)
            .map_err(|source| Error::Segmentation {
                tile: tile.index,
                source,
            })?;
        if labels.width() != tile.width() || labels.height() != tile.height() {
            return Err(Error::Segmentation {
                tile: tile.index,
                source: anyhow!(
                    "label raster is {}x{}, tile is {}x{}",
                    labels.width(),
                    labels.height(),
                    tile.width(),
                    tile.height()
                ),
            });
        }
        let cells = CellTable::from_labels(&labels);

        let narrow = self.analyze_level(SensitivityLevel::Narrow, &channels.marker, &labels, &cells)?;
        let broad = self.analyze_level(SensitivityLevel::Broad, &channels.marker, &labels, &cells)?;

        let analysis = TileAnalysis {
            index: tile.index,
            cells,
            narrow,
            broad,
        };
        tracing::debug!(
            tile = tile.index,
            cells = analysis.cells.cell_count(),
            narrow = analysis.narrow.colocalization.positive_count(),
            broad = analysis.broad.colocalization.positive_count(),
            "Tile analyzed"
        );
        Ok(analysis)
    }

    fn analyze_level(
        &self,
        level: SensitivityLevel,
        marker: &StainRaster,
        labels: &LabelRaster,
        cells: &CellTable,
    ) -> Result<LevelAnalysis> {
        let positivity = build_positivity_mask(marker, level, &self.config.positivity);
        // The pass consumes its mask; keep the thresholded one for observers.
        let colocalization = colocalize(
            labels,
            positivity.mask.clone(),
            &cells.areas,
            &self.config.colocalization,
        )?;
        Ok(LevelAnalysis {
            positivity,
            colocalization,
        })
    }

    /// Analyze all `tiles` (in index order) of one image.
    pub fn analyze_image(&self, tiles: &[Tile], segmenter: &dyn CellSegmenter) -> Result<ImageReport> {
        self.analyze_image_with(tiles, segmenter, |_, _| {})
    }

    /// Like [`Analyzer::analyze_image`], handing every analyzed tile to `observer`.
    ///
    /// The observer runs on worker threads, in no particular order.
    pub fn analyze_image_with<F>(
        &self,
        tiles: &[Tile],
        segmenter: &dyn CellSegmenter,
        observer: F,
    ) -> Result<ImageReport>
    where
        F: Fn(&Tile, &TileAnalysis) + Sync,
    {
        debug_assert!(
            tiles.windows(2).all(|w| w[0].index < w[1].index),
            "tiles must be sorted by index"
        );

        let map = self.classify_tiles(tiles);
        let slots: Vec<usize> = (0..tiles.len()).collect();

        let outcomes = common::parallel::try_par_map_limited(
            &slots,
            self.config.max_concurrent_tiles,
            |&slot| -> Result<TileOutcome> {
                let tile = &tiles[slot];
                if !map.is_classifiable(slot) {
                    return Ok(TileOutcome::Unclassifiable);
                }
                if !map.classes[slot] {
                    return Ok(TileOutcome::Skipped);
                }
                if self.config.blur.enabled {
                    let blurry = self.blur_detector.is_blurry(&tile.raster);
                    tile.set_blurry(blurry);
                    if blurry {
                        tracing::debug!(tile = tile.index, "Tile is blurry, skipping");
                        return Ok(TileOutcome::Blurry);
                    }
                }

                let analysis = self.analyze_tile(tile, segmenter)?;
                observer(tile, &analysis);
                Ok(TileOutcome::Analyzed {
                    counts: analysis.counts(),
                    floor_applied: analysis.floor_applied(),
                })
            },
        )?;

        let mut report = ImageReport::new();
        for (tile, outcome) in tiles.iter().zip(outcomes) {
            report.record(tile.index, outcome);
        }

        tracing::info!(
            tiles = report.tile_count,
            analyzed = report.analyzed_tiles(),
            skipped = report.skipped_tiles.len(),
            blurry = report.blurry_tiles.len(),
            unclassifiable = report.unclassifiable_tiles.len(),
            cells = report.total_cells,
            narrow = report.positive.narrow,
            broad = report.positive.broad,
            "Image analyzed"
        );
        Ok(report)
    }
}
