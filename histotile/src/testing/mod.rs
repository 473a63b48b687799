//! Testing utilities for histotile.

#![allow(dead_code)]

use glam::DVec2;

use crate::tile::{LabelRaster, RgbRaster, Tile};

/// Base color of target (bluish) tissue.
pub const BLUISH: [u8; 3] = [110, 100, 190];
/// Base color of non-target (reddish) matter.
pub const REDDISH: [u8; 3] = [200, 110, 130];
/// Pale bluish background: target tissue with little hematoxylin.
pub const PALE: [u8; 3] = [225, 220, 240];
/// Strongly hematoxylin-stained color.
pub const STAINED: [u8; 3] = [40, 30, 120];

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Raster of `base` with a deterministic +-10 texture added to every channel.
pub fn textured_raster(width: usize, height: usize, base: [u8; 3]) -> RgbRaster {
    RgbRaster::from_fn(width, height, |x, y| {
        let jitter = ((x * 7 + y * 13) % 21) as i32 - 10;
        base.map(|c| (c as i32 + jitter).clamp(0, 255) as u8)
    })
}

/// A 32x32 textured tile at `position`.
pub fn textured_tile(index: usize, position: DVec2, base: [u8; 3]) -> Tile {
    Tile::new(index, position, textured_raster(32, 32, base))
}

/// Textured pale raster with flat `STAINED` squares of side `size` at the given top-left corners.
pub fn stained_raster(width: usize, height: usize, blobs: &[(usize, usize)], size: usize) -> RgbRaster {
    let mut raster = textured_raster(width, height, PALE);
    for &(bx, by) in blobs {
        for y in by..(by + size).min(height) {
            for x in bx..(bx + size).min(width) {
                raster[(x, y)] = STAINED;
            }
        }
    }
    raster
}

/// Label raster with square cells of side `size` at the given top-left corners,
/// labeled `1..` in order.
pub fn square_cells(width: usize, height: usize, cells: &[(usize, usize)], size: usize) -> LabelRaster {
    LabelRaster::from_fn(width, height, |x, y| {
        cells
            .iter()
            .position(|&(cx, cy)| (cx..cx + size).contains(&x) && (cy..cy + size).contains(&y))
            .map_or(0, |i| i as u32 + 1)
    })
}
