use super::*;
use crate::cells::CellTable;

fn rect(x0: usize, y0: usize, x1: usize, y1: usize) -> impl Fn(usize, usize) -> bool {
    move |x, y| (x0..x1).contains(&x) && (y0..y1).contains(&y)
}

fn run(labels: &LabelRaster, positivity: BitBuffer2) -> Colocalization {
    let table = CellTable::from_labels(labels);
    colocalize(labels, positivity, &table.areas, &ColocalizationConfig::default()).unwrap()
}

#[test]
fn test_dilation_radius() {
    let config = ColocalizationConfig::default();
    assert_eq!(dilation_radius(0, &config), 0);
    assert_eq!(dilation_radius(3, &config), 0);
    assert_eq!(dilation_radius(63, &config), 3);
    assert_eq!(dilation_radius(64, &config), 4);
    assert_eq!(dilation_radius(100, &config), 5);
}

#[test]
fn test_blob_within_reach_is_claimed() {
    // Cell of area 64 (radius 4), 25-pixel blob overlapping its right side.
    let cell = rect(2, 2, 10, 10);
    let labels = LabelRaster::from_fn(30, 30, |x, y| cell(x, y) as u32);
    let positivity = BitBuffer2::from_fn(30, 30, rect(7, 4, 12, 9));
    assert_eq!(positivity.count_ones(), 25);

    let result = run(&labels, positivity);

    assert_eq!(result.positive_ids, vec![1]);
    assert_eq!(result.claimed_pixels, 25);
    assert!(!result.remaining.any());
    assert_eq!(result.positive_mask.count_ones(), 64);
    assert!(result.positive_mask.get_xy(2, 2));
    assert!(!result.positive_mask.get_xy(11, 4));
}

#[test]
fn test_blob_out_of_reach_is_untouched() {
    let cell = rect(2, 2, 10, 10);
    let labels = LabelRaster::from_fn(30, 30, |x, y| cell(x, y) as u32);
    // Nearest blob pixel is 5 columns from the cell, radius is 4.
    let positivity = BitBuffer2::from_fn(30, 30, rect(14, 4, 19, 9));

    let result = run(&labels, positivity.clone());

    assert!(result.positive_ids.is_empty());
    assert_eq!(result.claimed_pixels, 0);
    assert_eq!(result.remaining, positivity);
    assert!(!result.positive_mask.any());
}

#[test]
fn test_lower_identity_claims_shared_blob() {
    // Cell 2 on the left, cell 1 on the right, a one-pixel-wide blob between.
    let labels = LabelRaster::from_fn(12, 8, |x, y| match (x, y) {
        (1..=4, 2..=5) => 2,
        (6..=9, 2..=5) => 1,
        _ => 0,
    });
    let positivity = BitBuffer2::from_fn(12, 8, rect(5, 2, 6, 6));

    let result = run(&labels, positivity);

    assert_eq!(result.positive_ids, vec![1]);
    assert_eq!(result.claimed_pixels, 4);
    assert!(!result.remaining.any());
    assert!(result.positive_mask.get_xy(6, 2));
    assert!(!result.positive_mask.get_xy(1, 2));
}

#[test]
fn test_partial_claim_leaves_rest_for_next_cell() {
    // Cell 1 (area 4, radius 1) reaches only the first blob column.
    let labels = LabelRaster::from_fn(10, 2, |x, _| match x {
        0..2 => 1,
        6..8 => 2,
        _ => 0,
    });
    let positivity = BitBuffer2::from_fn(10, 2, rect(2, 0, 6, 2));

    let result = run(&labels, positivity);

    assert_eq!(result.positive_ids, vec![1, 2]);
    assert_eq!(result.claimed_pixels, 4);
    assert_eq!(result.remaining.count_ones(), 4);
    assert!(result.remaining.get_xy(3, 0));
    assert!(result.remaining.get_xy(4, 1));
}

#[test]
fn test_background_is_never_positive() {
    let labels = LabelRaster::new_default(6, 6);
    let positivity = BitBuffer2::new_filled(6, 6, true);

    let result = run(&labels, positivity);

    assert!(result.positive_ids.is_empty());
    assert_eq!(result.remaining.count_ones(), 36);
}

#[test]
fn test_radius_zero_needs_direct_overlap() {
    let labels = LabelRaster::new(5, 1, vec![1, 0, 0, 2, 0]);
    let positivity = BitBuffer2::from_fn(5, 1, |x, _| x == 1 || x == 3);

    let result = run(&labels, positivity);

    assert_eq!(result.positive_ids, vec![2]);
    assert!(result.remaining.get_xy(1, 0));
    assert!(!result.remaining.get_xy(3, 0));
}

#[test]
fn test_cell_at_border_is_clipped() {
    let labels = LabelRaster::from_fn(6, 6, |x, y| if x == 0 && y == 0 { 5 } else { 0 });
    let areas = BTreeMap::from([(5, 400)]);
    let positivity = BitBuffer2::from_fn(6, 6, |x, y| x == 5 && y == 5);

    let result =
        colocalize(&labels, positivity, &areas, &ColocalizationConfig::default()).unwrap();

    // Radius 10 covers the whole tile from the corner.
    assert_eq!(result.positive_ids, vec![5]);
    assert_eq!(result.claimed_pixels, 1);
}

#[test]
fn test_unmatched_identity_is_reported() {
    let labels = LabelRaster::new(4, 1, vec![1, 0, 2, 3]);
    let areas = BTreeMap::from([(1, 1), (3, 1)]);
    let positivity = BitBuffer2::new_filled(4, 1, true);

    let err = colocalize(&labels, positivity, &areas, &ColocalizationConfig::default())
        .unwrap_err();

    assert!(matches!(err, Error::UnmatchedCellIdentity { label: 2 }));
}

#[test]
fn test_claims_never_exceed_mask_and_repeat_identically() {
    let (width, height) = (48, 40);
    let labels = LabelRaster::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 3 == 0 {
            ((x / 8) + (y / 8) * 6 + 1) as u32
        } else {
            0
        }
    });
    let positivity = BitBuffer2::from_fn(width, height, |x, y| (x * 31 + y * 17) % 11 < 3);
    let original = positivity.count_ones();

    let first = run(&labels, positivity.clone());
    let second = run(&labels, positivity);

    assert!(first.claimed_pixels <= original);
    assert_eq!(first.claimed_pixels + first.remaining.count_ones(), original);
    assert!(!first.positive_ids.contains(&0));
    assert_eq!(first.positive_ids, second.positive_ids);
    assert_eq!(first.positive_mask, second.positive_mask);
    assert_eq!(first.remaining, second.remaining);
}
