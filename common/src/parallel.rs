//! Bounded parallel mapping and pairwise tree reduction.
//!
//! Both helpers wrap rayon's `into_par_iter`. `try_map_bounded` limits how many
//! owned items are in flight at once (e.g. to cap memory held by per-item state),
//! `try_tree_reduce` combines items pairwise level by level.

use rayon::prelude::*;

/// Maps `f` over owned `items` in parallel, with at most `max_in_flight` items in flight.
///
/// Results keep the input order. Stops at the first chunk that contains an error
/// and returns it; items within the failing chunk may still be processed.
///
/// # Panics
///
/// Panics if `max_in_flight` is 0.
pub fn try_map_bounded<T, R, E, F>(items: Vec<T>, max_in_flight: usize, f: F) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Sync,
{
    assert!(max_in_flight > 0, "max_in_flight must be > 0");

    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        let chunk: Vec<T> = items.by_ref().take(max_in_flight).collect();
        let chunk_results: Result<Vec<R>, E> = chunk.into_par_iter().map(&f).collect();
        results.extend(chunk_results?);
    }
    Ok(results)
}

/// Reduces `items` with `f` as a balanced binary tree, one level at a time.
///
/// Each level combines neighbours `(0, 1), (2, 3), ...` in parallel; an odd item
/// out is carried to the end of the next level. The left operand always precedes
/// the right one in input order, so an associative `f` gives the same result as a
/// sequential left fold. Returns `None` for an empty input.
pub fn try_tree_reduce<T, E, F>(mut items: Vec<T>, f: F) -> Result<Option<T>, E>
where
    T: Send,
    E: Send,
    F: Fn(T, T) -> Result<T, E> + Sync,
{
    while items.len() > 1 {
        let carry = if items.len() % 2 == 1 {
            items.pop()
        } else {
            None
        };

        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(left), Some(right)) = (iter.next(), iter.next()) {
            pairs.push((left, right));
        }

        items = pairs
            .into_par_iter()
            .map(|(left, right)| f(left, right))
            .collect::<Result<Vec<T>, E>>()?;
        items.extend(carry);
    }
    Ok(items.pop())
}
