//! End-to-end tests of the analyzer on synthetic tiles.

use std::sync::Mutex;

use glam::DVec2;

use super::*;
use crate::blur::BlurDetector;
use crate::config::VerticalSearchConfig;
use crate::segmentation::PrecomputedSegmentation;
use crate::testing::{PALE, REDDISH, init_tracing, square_cells, stained_raster, textured_raster};
use crate::tile::{LabelRaster, RgbRaster};

const SIZE: usize = 32;
const BLOB: usize = 6;

fn config() -> Config {
    Config {
        vertical_search: VerticalSearchConfig {
            max_axis_error: Some(100.0),
            ..Default::default()
        },
        max_concurrent_tiles: 2,
        ..Default::default()
    }
}

fn tile(index: usize, raster: RgbRaster) -> Tile {
    Tile::new(index, DVec2::new(0.0, index as f64 * 1000.0), raster)
}

/// Tiles: 0 reddish, 1 and 2 stained, 3 flat (blurry), 4 reddish, 5 empty.
fn scene() -> (Vec<Tile>, PrecomputedSegmentation) {
    let tiles = vec![
        tile(0, textured_raster(SIZE, SIZE, REDDISH)),
        tile(1, stained_raster(SIZE, SIZE, &[(4, 4), (20, 20)], BLOB)),
        tile(2, stained_raster(SIZE, SIZE, &[(10, 10)], BLOB)),
        tile(3, RgbRaster::new_filled(SIZE, SIZE, PALE)),
        tile(4, textured_raster(SIZE, SIZE, REDDISH)),
        tile(5, RgbRaster::new_default(0, 0)),
    ];

    let segmentation: PrecomputedSegmentation = [
        // Cell 1 covers the first blob, cell 2 is far from both, cell 3 touches the second.
        (1, square_cells(SIZE, SIZE, &[(4, 4), (20, 4), (14, 20)], BLOB)),
        (2, square_cells(SIZE, SIZE, &[(10, 10), (24, 24)], BLOB)),
    ]
    .into_iter()
    .collect();

    (tiles, segmentation)
}

#[test]
fn test_end_to_end_scenario() {
    init_tracing();

    let (tiles, segmentation) = scene();
    let report = Analyzer::from_config(config())
        .analyze_image(&tiles, &segmentation)
        .unwrap();

    assert_eq!(report.tile_count, 6);
    assert_eq!(report.skipped_tiles, vec![0, 4]);
    assert_eq!(report.blurry_tiles, vec![3]);
    assert_eq!(report.unclassifiable_tiles, vec![5]);
    assert_eq!(report.analyzed_tiles(), 2);

    assert_eq!(report.total_cells, 5);
    assert_eq!(report.positive, LevelCounts { narrow: 3, broad: 3 });
    assert_eq!(
        report.tiles[&1],
        TileCounts {
            positive: LevelCounts { narrow: 2, broad: 2 },
            cells: 3,
        }
    );
    assert_eq!(report.tiles[&2].cells, 2);
    assert_eq!(report.tiles[&0], TileCounts::default());
    assert_eq!(report.tiles[&3], TileCounts::default());

    assert_eq!(tiles[0].is_target(), Some(false));
    assert_eq!(tiles[1].is_target(), Some(true));
    assert_eq!(tiles[3].is_blurry(), Some(true));
    assert_eq!(tiles[1].is_blurry(), Some(false));
    assert_eq!(tiles[0].is_blurry(), None);
}

#[test]
fn test_observer_sees_analyzed_tiles() {
    let (tiles, segmentation) = scene();
    let seen = Mutex::new(Vec::new());

    Analyzer::from_config(config())
        .analyze_image_with(&tiles, &segmentation, |tile, analysis| {
            assert_eq!(tile.index, analysis.index);
            seen.lock().unwrap().push((
                tile.index,
                analysis.level(SensitivityLevel::Broad).positivity.mask.count_ones(),
                analysis.broad.colocalization.positive_ids.clone(),
            ));
        })
        .unwrap();

    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    assert_eq!(
        seen,
        vec![(1, 2 * BLOB * BLOB, vec![1, 3]), (2, BLOB * BLOB, vec![1])]
    );
}

#[test]
fn test_analyze_tile_keeps_thresholded_mask() {
    let analyzer = Analyzer::from_config(config());
    let tile = tile(0, stained_raster(SIZE, SIZE, &[(4, 4)], BLOB));
    let labels = square_cells(SIZE, SIZE, &[(4, 4)], BLOB);
    let segmenter = move |_: &Tile, _: &StainRaster| -> anyhow::Result<LabelRaster> { Ok(labels.clone()) };

    let analysis = analyzer.analyze_tile(&tile, &segmenter).unwrap();

    for level in [SensitivityLevel::Narrow, SensitivityLevel::Broad] {
        let result = analysis.level(level);
        assert_eq!(result.positivity.level, level);
        assert_eq!(result.positivity.mask.count_ones(), BLOB * BLOB);
        assert_eq!(result.colocalization.positive_ids, vec![1]);
        assert_eq!(result.colocalization.claimed_pixels, BLOB * BLOB);
        assert!(!result.colocalization.remaining.any());
    }
    assert_eq!(analysis.counts().cells, 1);
}

#[test]
fn test_segmentation_errors_propagate() {
    let (tiles, _) = scene();
    let failing = |tile: &Tile, _: &StainRaster| -> anyhow::Result<LabelRaster> {
        anyhow::bail!("model unavailable for tile {}", tile.index)
    };

    let err = Analyzer::from_config(config())
        .analyze_image(&tiles, &failing)
        .unwrap_err();

    match err {
        Error::Segmentation { tile, source } => {
            assert!(tile == 1 || tile == 2);
            assert!(source.to_string().starts_with("model unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_label_shape_mismatch_is_rejected() {
    let analyzer = Analyzer::from_config(config());
    let tile = tile(0, stained_raster(SIZE, SIZE, &[], BLOB));
    let segmenter =
        |_: &Tile, _: &StainRaster| -> anyhow::Result<LabelRaster> { Ok(LabelRaster::new_default(4, 4)) };

    let err = analyzer.analyze_tile(&tile, &segmenter).unwrap_err();
    assert!(err.to_string().contains("label raster is 4x4, tile is 32x32"));
}

#[test]
fn test_blur_check_can_be_disabled_or_replaced() {
    let (tiles, _) = scene();
    let empty_cells = |tile: &Tile, _: &StainRaster| -> anyhow::Result<LabelRaster> {
        Ok(LabelRaster::new_default(tile.width(), tile.height()))
    };

    let mut no_blur = config();
    no_blur.blur.enabled = false;
    let report = Analyzer::from_config(no_blur).analyze_image(&tiles, &empty_cells).unwrap();
    assert!(report.blurry_tiles.is_empty());
    assert_eq!(report.analyzed_tiles(), 3);
    assert_eq!(report.total_cells, 0);

    struct AlwaysBlurry;
    impl BlurDetector for AlwaysBlurry {
        fn is_blurry(&self, _: &RgbRaster) -> bool {
            true
        }
    }
    let (tiles, _) = scene();
    let report = Analyzer::from_config(config())
        .with_blur_detector(AlwaysBlurry)
        .analyze_image(&tiles, &empty_cells)
        .unwrap();
    assert_eq!(report.blurry_tiles, vec![1, 2, 3]);
    assert_eq!(report.analyzed_tiles(), 0);
}

#[test]
fn test_repeated_analysis_is_identical() {
    let (tiles, segmentation) = scene();
    let first = Analyzer::from_config(config()).analyze_image(&tiles, &segmentation).unwrap();
    let (tiles, segmentation) = scene();
    let second = Analyzer::from_config(config()).analyze_image(&tiles, &segmentation).unwrap();
    assert_eq!(first, second);
}
