//! Bounded parallel work with ordered, single-threaded commit.
//!
//! Items are processed on the rayon pool in chunks of at most `max_concurrent`,
//! and each chunk's results are handed to `commit` on the calling thread in item
//! order. The commit side therefore observes a deterministic sequence no matter
//! in which order the workers finish.

use std::ops::ControlFlow;

use rayon::prelude::*;


/// Multiplier for number of in-flight items relative to CPU threads.
const ITEMS_PER_THREAD: usize = 2;

/// Default in-flight limit for [`par_map_ordered`] callers that don't pick one.
#[inline]
pub fn default_concurrency() -> usize {
    (rayon::current_num_threads() * ITEMS_PER_THREAD).max(1)
}

/// Maps `work` over `items` in parallel and feeds the results to `commit` in order.
///
/// At most `max_concurrent` items are in flight at once. `commit` receives the
/// item index and its result; returning [`ControlFlow::Break`] stops the run
/// before the next chunk is started. Results of the current chunk that come
/// after the break are dropped.
///
/// Returns the number of committed items.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn par_map_ordered<T, R, F, C>(
    items: &[T],
    max_concurrent: usize,
    work: F,
    mut commit: C,
) -> usize
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
    C: FnMut(usize, R) -> ControlFlow<()>,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut committed = 0;
    for (chunk_idx, chunk) in items.chunks(max_concurrent).enumerate() {
        let base = chunk_idx * max_concurrent;
        let results: Vec<R> = chunk
            .par_iter()
            .enumerate()
            .map(|(offset, item)| work(base + offset, item))
            .collect();

        for (offset, result) in results.into_iter().enumerate() {
            if commit(base + offset, result).is_break() {
                return committed;
            }
            committed += 1;
        }
    }
    committed
}
