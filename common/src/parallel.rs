//! Bounded parallel iteration.
//!
//! Wraps rayon's `par_iter` so that at most `max_concurrent` items are in
//! flight at once. Used where each item owns large intermediate buffers
//! (per-tile rasters) and unbounded parallelism would multiply peak memory.

use rayon::prelude::*;

/// Maps the fallible `f` over `items` in parallel, with at most
/// `max_concurrent` items in flight.
///
/// Output order matches input order. Stops after the first chunk that
/// produced an error and returns that error; other items of the failing
/// chunk may already have run.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn try_par_map_limited<T, R, E, F>(
    items: &[T],
    max_concurrent: usize,
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(max_concurrent) {
        let chunk_results: Result<Vec<R>, E> = chunk.par_iter().map(&f).collect();
        results.extend(chunk_results?);
    }
    Ok(results)
}
