//! Tests for connected component labeling.

use super::*;

fn mask_from_rows(rows: &[&str]) -> BitBuffer2 {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    BitBuffer2::from_fn(width, height, |x, y| rows[y].as_bytes()[x] == b'#')
}

// =============================================================================
// Basic labeling
// =============================================================================

#[test]
fn test_empty_mask() {
    let mask = BitBuffer2::new_default(8, 4);
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    assert_eq!(labels.num_labels(), 0);
    assert!(labels.labels().iter().all(|&l| l == 0));
}

#[test]
fn test_zero_sized_mask() {
    let mask = BitBuffer2::new_default(0, 0);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.num_labels(), 0);
    assert_eq!(labels.areas(), vec![0]);
}

#[test]
fn test_two_separate_blobs() {
    let mask = mask_from_rows(&[
        "##...", //
        "##...",
        ".....",
        "...##",
    ]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);

    assert_eq!(labels.num_labels(), 2);
    assert_eq!(labels[0], 1);
    assert_eq!(labels[3 * 5 + 4], 2);
    assert_eq!(labels.areas(), vec![14, 4, 2]);
}

#[test]
fn test_labels_are_sequential_in_scan_order() {
    let mask = mask_from_rows(&[
        "#.#.#", //
        ".....",
        "#...#",
    ]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);

    assert_eq!(labels.num_labels(), 5);
    assert_eq!(labels[0], 1);
    assert_eq!(labels[2], 2);
    assert_eq!(labels[4], 3);
    assert_eq!(labels[10], 4);
    assert_eq!(labels[14], 5);
}

// =============================================================================
// Connectivity
// =============================================================================

#[test]
fn test_diagonal_joins_only_with_eight_connectivity() {
    let mask = mask_from_rows(&[
        "#..", //
        ".#.",
        "..#",
    ]);

    let four = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(four.num_labels(), 3);

    let eight = LabelMap::from_mask(&mask, Connectivity::Eight);
    assert_eq!(eight.num_labels(), 1);
    assert_eq!(eight.areas()[1], 3);
}

#[test]
fn test_u_shape_merges_in_union_find() {
    // Both arms start as separate labels and meet on the last row.
    let mask = mask_from_rows(&[
        "#...#", //
        "#...#",
        "#####",
    ]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);

    assert_eq!(labels.num_labels(), 1);
    let labeled = BitBuffer2::from_fn(5, 3, |x, y| labels.labels()[(x, y)] == 1);
    assert_eq!(labeled, mask);
}

#[test]
fn test_runs_across_word_boundary() {
    let width = 200;
    let mask = BitBuffer2::from_fn(width, 2, |x, y| match y {
        0 => (60..140).contains(&x),
        _ => x == 0 || x == 199,
    });
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);

    assert_eq!(labels.num_labels(), 3);
    assert_eq!(labels.areas()[1], 80);
}

#[test]
fn test_full_words_form_single_run() {
    let mask = BitBuffer2::new_filled(128, 3, true);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    assert_eq!(labels.num_labels(), 1);
    assert_eq!(labels.areas()[1], 384);
}

// =============================================================================
// Area filtering
// =============================================================================

#[test]
fn test_retain_min_area_boundary() {
    // A 19-pixel component is dropped, a 20-pixel one kept.
    let mask = BitBuffer2::from_fn(30, 5, |x, y| (y == 0 && x < 19) || (y == 4 && x < 20));
    let labels = LabelMap::from_mask(&mask, Connectivity::Eight);
    assert_eq!(labels.num_labels(), 2);

    let (kept_mask, kept) = labels.retain_min_area(20);
    assert_eq!(kept, 1);
    assert_eq!(kept_mask.count_ones(), 20);
    assert!(!kept_mask.get_xy(0, 0));
    assert!(kept_mask.get_xy(0, 4));
}

#[test]
fn test_retain_min_area_zero_keeps_everything() {
    let mask = mask_from_rows(&["#.#", "...", "#.#"]);
    let labels = LabelMap::from_mask(&mask, Connectivity::Four);
    let (kept_mask, kept) = labels.retain_min_area(0);
    assert_eq!(kept, 4);
    assert_eq!(kept_mask, mask);
}
