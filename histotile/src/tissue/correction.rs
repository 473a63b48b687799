//! Spatial correction of per-tile tissue classes.
//!
//! Isolated classifications are smoothed first along the acquisition order
//! (index neighbors), then across the physical layout (the tiles above and
//! below).

use glam::DVec2;

use crate::config::{SearchAxis, VerticalSearchConfig};

/// Direction of a neighbor search along the search axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    #[inline]
    fn sign(self) -> f64 {
        match self {
            Direction::Above => -1.0,
            Direction::Below => 1.0,
        }
    }
}

/// Split a position into (axis, lateral) components.
#[inline]
fn components(position: DVec2, axis: SearchAxis) -> (f64, f64) {
    match axis {
        SearchAxis::X => (position.x, position.y),
        SearchAxis::Y => (position.y, position.x),
    }
}

/// Flip tiles whose two index neighbors agree with each other but not with
/// the tile. Reads a frozen copy; the first and last tiles are never changed.
///
/// Tiles with `locked[i]` set are read but never flipped. Returns the number
/// of flips.
pub fn horizontal_pass(classes: &mut [bool], locked: &[bool]) -> usize {
    assert_eq!(classes.len(), locked.len(), "length mismatch");
    if classes.len() < 3 {
        return 0;
    }

    let frozen = classes.to_vec();
    let mut flips = 0;
    for i in 1..classes.len() - 1 {
        if locked[i] {
            continue;
        }
        let (prev, next) = (frozen[i - 1], frozen[i + 1]);
        if prev == next && frozen[i] != prev {
            classes[i] = prev;
            flips += 1;
        }
    }
    flips
}

/// Locate the tile expected `config.offset` away from tile `index` in `direction`.
///
/// Candidates are ranked by their distance to the expected axis coordinate,
/// the closest `window` are kept, and among those the one with the smallest
/// lateral offset wins (ties: smaller axis error, then lower index). Returns `None` when no other tile exists or when the
/// winner is farther than `max_axis_error` from the expected coordinate.
pub fn find_vertical_neighbor(
    positions: &[DVec2],
    index: usize,
    direction: Direction,
    config: &VerticalSearchConfig,
) -> Option<usize> {
    let (axis, lateral) = components(positions[index], config.axis);
    let expected = axis + direction.sign() * config.offset;

    let axis_error = |j: usize| (components(positions[j], config.axis).0 - expected).abs();
    let lateral_offset = |j: usize| (components(positions[j], config.axis).1 - lateral).abs();

    let mut candidates: Vec<usize> = (0..positions.len()).collect();
    candidates.sort_by(|&a, &b| axis_error(a).total_cmp(&axis_error(b)));
    candidates.truncate(config.window);
    candidates.retain(|&j| j != index);

    candidates.sort_by(|&a, &b| {
        lateral_offset(a)
            .total_cmp(&lateral_offset(b))
            .then_with(|| axis_error(a).total_cmp(&axis_error(b)))
            .then(a.cmp(&b))
    });

    let best = *candidates.first()?;
    match config.max_axis_error {
        Some(max) if axis_error(best) > max => None,
        _ => Some(best),
    }
}

/// Outcome counters of [`vertical_pass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerticalPassStats {
    pub flips: usize,
    pub lookup_failures: usize,
}

/// Promote non-target tiles whose upper and lower neighbors are both target.
///
/// Tiles are visited in index order and see the flips made before them.
pub fn vertical_pass(
    classes: &mut [bool],
    locked: &[bool],
    positions: &[DVec2],
    config: &VerticalSearchConfig,
) -> VerticalPassStats {
    assert_eq!(classes.len(), locked.len(), "length mismatch");
    assert_eq!(classes.len(), positions.len(), "length mismatch");

    let mut stats = VerticalPassStats::default();
    for i in 0..classes.len() {
        if classes[i] || locked[i] {
            continue;
        }

        let above = find_vertical_neighbor(positions, i, Direction::Above, config);
        let below = find_vertical_neighbor(positions, i, Direction::Below, config);
        let (Some(above), Some(below)) = (above, below) else {
            tracing::debug!(tile = i, "No vertical neighbor found");
            stats.lookup_failures += 1;
            continue;
        };

        if classes[above] && classes[below] {
            classes[i] = true;
            stats.flips += 1;
        }
    }
    stats
}
