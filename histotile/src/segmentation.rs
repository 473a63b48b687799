//! Boundary to the external cell segmentation model.

use std::collections::HashMap;

use anyhow::anyhow;

use crate::tile::{LabelRaster, StainRaster, Tile};

/// Produces a labeled cell raster for a tile.
///
/// `nuclear` is the nuclear-stain rendering of the tile. The returned raster
/// must have the tile's shape; `0` marks background.
pub trait CellSegmenter: Send + Sync {
    fn segment(&self, tile: &Tile, nuclear: &StainRaster) -> anyhow::Result<LabelRaster>;
}

impl<F> CellSegmenter for F
where
    F: Fn(&Tile, &StainRaster) -> anyhow::Result<LabelRaster> + Send + Sync,
{
    fn segment(&self, tile: &Tile, nuclear: &StainRaster) -> anyhow::Result<LabelRaster> {
        self(tile, nuclear)
    }
}

/// Label rasters computed ahead of time, keyed by tile index.
#[derive(Debug, Default)]
pub struct PrecomputedSegmentation {
    labels: HashMap<usize, LabelRaster>,
}

impl PrecomputedSegmentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: usize, labels: LabelRaster) -> Option<LabelRaster> {
        self.labels.insert(tile, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(usize, LabelRaster)> for PrecomputedSegmentation {
    fn from_iter<I: IntoIterator<Item = (usize, LabelRaster)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

impl CellSegmenter for PrecomputedSegmentation {
    fn segment(&self, tile: &Tile, _nuclear: &StainRaster) -> anyhow::Result<LabelRaster> {
        let labels = self
            .labels
            .get(&tile.index)
            .ok_or_else(|| anyhow!("no segmentation for tile {}", tile.index))?;
        if labels.width() != tile.width() || labels.height() != tile.height() {
            anyhow::bail!(
                "segmentation of tile {} is {}x{}, tile is {}x{}",
                tile.index,
                labels.width(),
                labels.height(),
                tile.width(),
                tile.height()
            );
        }
        Ok(labels.clone())
    }
}
