//! Tiles (fields of view) and the rasters they carry.

use std::sync::OnceLock;

use common::Buffer2;
use glam::DVec2;

/// 8-bit RGB raster as acquired.
pub type RgbRaster = Buffer2<[u8; 3]>;

/// Stain-separated RGB raster, channels in `[0, 1]`.
pub type StainRaster = Buffer2<[f32; 3]>;

/// Cell segmentation: `0` is background, every other value one cell.
pub type LabelRaster = Buffer2<u32>;

/// One field of view of a tiled scan.
///
/// Tissue class and blur status are decided once by the analysis and can't
/// be overwritten afterwards.
#[derive(Debug)]
pub struct Tile {
    pub index: usize,
    /// Physical stage position of the tile.
    pub position: DVec2,
    pub raster: RgbRaster,
    tissue: OnceLock<bool>,
    blurry: OnceLock<bool>,
}

impl Tile {
    pub fn new(index: usize, position: DVec2, raster: RgbRaster) -> Self {
        Self {
            index,
            position,
            raster,
            tissue: OnceLock::new(),
            blurry: OnceLock::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.raster.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.raster.height()
    }

    /// `Some(true)` for target tissue, once classified.
    pub fn is_target(&self) -> Option<bool> {
        self.tissue.get().copied()
    }

    /// Record the final tissue class. Returns `false` if it was already set.
    pub fn set_target(&self, target: bool) -> bool {
        self.tissue.set(target).is_ok()
    }

    pub fn is_blurry(&self) -> Option<bool> {
        self.blurry.get().copied()
    }

    /// Record the blur status. Returns `false` if it was already set.
    pub fn set_blurry(&self, blurry: bool) -> bool {
        self.blurry.set(blurry).is_ok()
    }
}
