//! Morphological dilation of binary masks with a diamond footprint.
//!
//! One step ORs each row with its one-pixel horizontal smear and with the
//! rows directly above and below (a 3x3 cross). Repeating the step `r` times
//! gives the L1 ball of radius `r`, clipped to the buffer.


use common::BitBuffer2;
use rayon::prelude::*;

/// Dilate `mask` by `radius` cross steps into `output`.
pub fn dilate_mask(mask: &BitBuffer2, radius: usize, output: &mut BitBuffer2) {
    assert_eq!(mask.width(), output.width(), "width mismatch");
    assert_eq!(mask.height(), output.height(), "height mismatch");

    output.copy_from(mask);
    if radius == 0 || mask.is_empty() {
        return;
    }

    let mut scratch = output.clone();
    for _ in 0..radius {
        std::mem::swap(output, &mut scratch);
        let changed = cross_step(&scratch, output);
        if !changed {
            break;
        }
    }
}

/// One cross step from `input` into `output`. Returns whether any bit was added.
fn cross_step(input: &BitBuffer2, output: &mut BitBuffer2) -> bool {
    let width = input.width();
    let height = input.height();
    let words_per_row = input.words_per_row();
    let tail_mask = tail_mask(width);

    output
        .words_mut()
        .par_chunks_mut(words_per_row)
        .enumerate()
        .map(|(y, out_row)| {
            let row = input.row_words(y);
            let above = (y > 0).then(|| input.row_words(y - 1));
            let below = (y + 1 < height).then(|| input.row_words(y + 1));

            let mut changed = false;
            for word_idx in 0..words_per_row {
                let mut result = dilate_word(row, word_idx);
                if let Some(above) = above {
                    result |= above[word_idx];
                }
                if let Some(below) = below {
                    result |= below[word_idx];
                }
                if word_idx + 1 == words_per_row {
                    result &= tail_mask;
                }
                changed |= result != row[word_idx];
                out_row[word_idx] = result;
            }
            changed
        })
        .reduce(|| false, |a, b| a | b)
}

/// Horizontal one-pixel dilation of a word, pulling in the edge bits of its neighbors.
#[inline]
fn dilate_word(row: &[u64], word_idx: usize) -> u64 {
    let current = row[word_idx];
    let mut result = current | (current << 1) | (current >> 1);

    if word_idx > 0 {
        result |= row[word_idx - 1] >> 63;
    }
    if word_idx + 1 < row.len() {
        result |= row[word_idx + 1] << 63;
    }

    result
}

/// Valid bits of the last word of a row.
#[inline]
fn tail_mask(width: usize) -> u64 {
    match width % 64 {
        0 => !0u64,
        rem => (1u64 << rem) - 1,
    }
}
