//! Proximity-biased sampling over distance-ordered candidates.
//!
//! Candidates are expected to be sorted nearest first. An index is drawn as
//! `floor((n + 1)^u - 1)` with `u` uniform in `[0, 1)`, which favours the nearest candidates while
//! leaving every candidate a non-zero chance of being picked.

use rand::Rng;

/// Draws an index in `[0, n)` biased towards 0, `None` if `n` is 0.
pub fn sample_index<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Option<usize> {
    if n == 0 {
        return None;
    }

    let u: f64 = rng.gen();
    let j = ((n as f64 + 1.0).powf(u) - 1.0).floor();

    // Float rounding can land on `n` for `u` close to 1.
    Some((j.max(0.0) as usize).min(n - 1))
}

/// Removes and returns a candidate drawn with [`sample_index`], leaving the residual list in
/// place for the next draw.
pub fn draw<T, R: Rng + ?Sized>(candidates: &mut Vec<T>, rng: &mut R) -> Option<T> {
    sample_index(candidates.len(), rng).map(|j| candidates.remove(j))
}
