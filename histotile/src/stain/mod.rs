//! Color deconvolution into stain channels.
//!
//! [`HedSeparator`] projects optical density onto the hematoxylin, eosin and
//! DAB stain vectors, then recomposes a single stain back into RGB so the
//! downstream thresholding can work on an ordinary intensity image.


use glam::{DMat3, DVec3};

use crate::tile::{RgbRaster, StainRaster};

/// Stain vectors (rows): hematoxylin, eosin, DAB.
pub const RGB_FROM_HED: [[f64; 3]; 3] = [[0.65, 0.70, 0.29], [0.07, 0.99, 0.11], [0.27, 0.57, 0.78]];

/// Intensities are clamped to this before taking the logarithm.
const MIN_INTENSITY: f64 = 1e-6;

/// Single-stain RGB renderings of a tile.
#[derive(Debug, Clone)]
pub struct StainChannels {
    /// Rendering of the marker stain, thresholded into positivity masks.
    pub marker: StainRaster,
    /// Rendering of the nuclear stain, handed to the cell segmenter.
    pub nuclear: StainRaster,
}

/// Splits an RGB tile into stain renderings.
pub trait StainSeparator: Send + Sync {
    fn separate(&self, raster: &RgbRaster) -> StainChannels;
}

/// Index of a stain in [`RGB_FROM_HED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stain {
    Hematoxylin,
    Eosin,
    Dab,
}

impl Stain {
    #[inline]
    fn isolate(self, stains: DVec3) -> DVec3 {
        match self {
            Stain::Hematoxylin => DVec3::new(stains.x, 0.0, 0.0),
            Stain::Eosin => DVec3::new(0.0, stains.y, 0.0),
            Stain::Dab => DVec3::new(0.0, 0.0, stains.z),
        }
    }
}

/// Hematoxylin/eosin/DAB color deconvolution.
#[derive(Debug, Clone)]
pub struct HedSeparator {
    rgb_from_hed: DMat3,
    hed_from_rgb: DMat3,
    marker: Stain,
    nuclear: Stain,
}

impl Default for HedSeparator {
    fn default() -> Self {
        Self::new(Stain::Hematoxylin, Stain::Dab)
    }
}

impl HedSeparator {
    pub fn new(marker: Stain, nuclear: Stain) -> Self {
        // Column-major from rows: `m * v` is the row-vector product `v @ RGB_FROM_HED`.
        let rgb_from_hed = DMat3::from_cols_array_2d(&RGB_FROM_HED);
        Self {
            rgb_from_hed,
            hed_from_rgb: rgb_from_hed.inverse(),
            marker,
            nuclear,
        }
    }

    /// Stain concentrations of one pixel, clamped at zero.
    pub fn stains(&self, [r, g, b]: [u8; 3]) -> DVec3 {
        let log_adjust = MIN_INTENSITY.ln();
        let od = DVec3::new(r as f64, g as f64, b as f64) / 255.0;
        let od = od.max(DVec3::splat(MIN_INTENSITY)).map(f64::ln) / log_adjust;
        (self.hed_from_rgb * od).max(DVec3::ZERO)
    }

    /// RGB rendering of stain concentrations, clipped to `[0, 1]`.
    pub fn compose(&self, stains: DVec3) -> [f32; 3] {
        let log_adjust = MIN_INTENSITY.ln();
        let rgb = (self.rgb_from_hed * stains * log_adjust)
            .map(f64::exp)
            .clamp(DVec3::ZERO, DVec3::ONE);
        rgb.as_vec3().to_array()
    }
}

impl StainSeparator for HedSeparator {
    fn separate(&self, raster: &RgbRaster) -> StainChannels {
        let stains = raster.map(|&rgb| self.stains(rgb));
        StainChannels {
            marker: stains.map(|&s| self.compose(self.marker.isolate(s))),
            nuclear: stains.map(|&s| self.compose(self.nuclear.isolate(s))),
        }
    }
}
