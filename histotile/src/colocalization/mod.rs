//! Cell/marker colocalization with greedy, non-reusable mask consumption.
//!
//! Cells are visited in ascending identity order. Each cell is dilated by a
//! radius proportional to the square root of its area; when the dilated cell
//! touches the remaining positivity mask the cell is positive and every
//! positive pixel under the dilation is cleared, so no later cell can match
//! the same region.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use common::BitBuffer2;

use crate::config::ColocalizationConfig;
use crate::dilation::dilate_mask;
use crate::error::{Error, Result};
use crate::tile::LabelRaster;

/// Outcome of one colocalization pass.
#[derive(Debug, Clone)]
pub struct Colocalization {
    /// Positive cell identities, ascending.
    pub positive_ids: Vec<u32>,
    /// Union of the (undilated) masks of the positive cells.
    pub positive_mask: BitBuffer2,
    /// Positivity pixels consumed by positive cells.
    pub claimed_pixels: usize,
    /// What is left of the positivity mask.
    pub remaining: BitBuffer2,
}

impl Colocalization {
    #[inline]
    pub fn positive_count(&self) -> usize {
        self.positive_ids.len()
    }
}

/// Inclusive pixel bounds of one cell.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl Bounds {
    fn point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Grow by `pad` on every side, clipped to `width x height`.
    fn padded(self, pad: usize, width: usize, height: usize) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(pad),
            min_y: self.min_y.saturating_sub(pad),
            max_x: self.max_x.saturating_add(pad).min(width - 1),
            max_y: self.max_y.saturating_add(pad).min(height - 1),
        }
    }

    #[inline]
    fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    #[inline]
    fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// Dilation radius of a cell with `area` pixels.
#[inline]
pub fn dilation_radius(area: usize, config: &ColocalizationConfig) -> usize {
    ((area as f64).sqrt() * config.radius_fraction).floor() as usize
}

/// Run one colocalization pass, consuming `positivity`.
///
/// Every identity of `labels` must have an entry in `areas`; this is checked
/// before any pixel is claimed.
pub fn colocalize(
    labels: &LabelRaster,
    mut positivity: BitBuffer2,
    areas: &BTreeMap<u32, usize>,
    config: &ColocalizationConfig,
) -> Result<Colocalization> {
    assert_eq!(labels.width(), positivity.width(), "width mismatch");
    assert_eq!(labels.height(), positivity.height(), "height mismatch");

    let width = labels.width();
    let height = labels.height();

    let mut cells: BTreeMap<u32, Bounds> = BTreeMap::new();
    for y in 0..height {
        for (x, &label) in labels.row(y).iter().enumerate() {
            if label == 0 {
                continue;
            }
            cells
                .entry(label)
                .and_modify(|b| b.include(x, y))
                .or_insert_with(|| Bounds::point(x, y));
        }
    }

    if let Some(&label) = cells.keys().find(|&&label| !areas.contains_key(&label)) {
        return Err(Error::UnmatchedCellIdentity { label });
    }

    let mut positive_ids = Vec::new();
    let mut positive_mask = BitBuffer2::new_default(width, height);
    let mut claimed_pixels = 0usize;

    for (&label, &bounds) in &cells {
        let radius = dilation_radius(areas[&label], config);
        let window = bounds.padded(radius, width, height);

        let cell = BitBuffer2::from_fn(window.width(), window.height(), |x, y| {
            labels[(window.min_x + x, window.min_y + y)] == label
        });
        let mut dilated = BitBuffer2::new_default(window.width(), window.height());
        dilate_mask(&cell, radius, &mut dilated);

        let overlap = dilated
            .iter_ones()
            .any(|(x, y)| positivity.get_xy(window.min_x + x, window.min_y + y));
        if !overlap {
            continue;
        }

        positive_ids.push(label);
        for (x, y) in cell.iter_ones() {
            positive_mask.set_xy(window.min_x + x, window.min_y + y, true);
        }
        for (x, y) in dilated.iter_ones() {
            let (px, py) = (window.min_x + x, window.min_y + y);
            if positivity.get_xy(px, py) {
                positivity.set_xy(px, py, false);
                claimed_pixels += 1;
            }
        }
    }

    tracing::debug!(
        cells = cells.len(),
        positive = positive_ids.len(),
        claimed_pixels,
        "Colocalization pass done"
    );

    Ok(Colocalization {
        positive_ids,
        positive_mask,
        claimed_pixels,
        remaining: positivity,
    })
}
