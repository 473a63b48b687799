//! Small numeric helpers.

/// Median of `data`, averaging the two central values for even lengths.
///
/// Mutates the input buffer (partial sort via quickselect). Returns `None`
/// for an empty slice.
pub fn median_f64_mut(data: &mut [f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let len = data.len();
    let mid = len / 2;
    let (left_part, median, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
    let right = *median;

    if len & 1 == 1 {
        Some(right)
    } else {
        let left = left_part.iter().copied().reduce(f64::max)?;
        Some((left + right) * 0.5)
    }
}

/// The value at rank `rank` (0-based, ascending) of a 256-bin histogram.
///
/// `rank` is clamped to the number of samples.
pub fn histogram_rank(histogram: &[usize; 256], rank: usize) -> u8 {
    let total: usize = histogram.iter().sum();
    debug_assert!(total > 0);
    let rank = rank.min(total - 1);

    let mut seen = 0usize;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as u8;
        }
    }
    255
}
