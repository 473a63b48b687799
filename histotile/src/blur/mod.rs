//! Focus check by Laplacian variance.


use crate::tile::RgbRaster;

/// Decides whether a tile is too blurry to analyze.
pub trait BlurDetector: Send + Sync {
    fn is_blurry(&self, raster: &RgbRaster) -> bool;
}

/// A tile is sharp when the variance of its 3x3 Laplacian exceeds a threshold.
#[derive(Debug, Clone, Copy)]
pub struct LaplacianBlurDetector {
    pub variance_threshold: f64,
}

impl Default for LaplacianBlurDetector {
    fn default() -> Self {
        Self {
            variance_threshold: 80.0,
        }
    }
}

impl BlurDetector for LaplacianBlurDetector {
    fn is_blurry(&self, raster: &RgbRaster) -> bool {
        let variance = laplacian_variance(raster);
        tracing::trace!(variance, "Laplacian variance");
        variance <= self.variance_threshold
    }
}

/// Mirror an out-of-range index back into `0..len`, without repeating the edge.
#[inline]
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let i = if i < 0 { -i } else { i };
    (if i > last { 2 * last - i } else { i }) as usize
}

/// Population variance of the 4-neighbor Laplacian over every channel.
pub fn laplacian_variance(raster: &RgbRaster) -> f64 {
    let width = raster.width();
    let height = raster.height();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 0..height {
        let up = reflect_101(y as isize - 1, height);
        let down = reflect_101(y as isize + 1, height);
        for x in 0..width {
            let left = reflect_101(x as isize - 1, width);
            let right = reflect_101(x as isize + 1, width);

            let center = raster[(x, y)];
            let neighbors = [raster[(left, y)], raster[(right, y)], raster[(x, up)], raster[(x, down)]];
            for c in 0..3 {
                let around: i32 = neighbors.iter().map(|n| n[c] as i32).sum();
                let value = (around - 4 * center[c] as i32) as f64;
                sum += value;
                sum_sq += value * value;
            }
        }
    }

    let n = (width * height * 3) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
