//! Per-cell areas and presence mask from a labeled segmentation raster.


use std::collections::BTreeMap;

use common::BitBuffer2;

use crate::tile::LabelRaster;

/// Areas and presence of the cells of one segmentation raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTable {
    /// Exact pixel area per cell identity, ascending. Background is not listed.
    pub areas: BTreeMap<u32, usize>,
    /// Pixels covered by any cell.
    pub presence: BitBuffer2,
}

impl CellTable {
    pub fn from_labels(labels: &LabelRaster) -> Self {
        let mut areas = BTreeMap::new();
        for &label in labels.iter().filter(|&&l| l != 0) {
            *areas.entry(label).or_insert(0usize) += 1;
        }

        let presence =
            BitBuffer2::from_fn(labels.width(), labels.height(), |x, y| labels[(x, y)] != 0);

        Self { areas, presence }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.areas.len()
    }

    #[inline]
    pub fn area(&self, label: u32) -> Option<usize> {
        self.areas.get(&label).copied()
    }
}
