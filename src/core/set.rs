//! Set helpers used to apportion outbound capacity across buckets.

/// Divides `total` into `parts` near-equal shares.
///
/// Every share is `total / parts`, the remainder is spread one by one over the first shares. An
/// empty list is returned if `parts` is 0.
pub fn partition(total: usize, parts: usize) -> Vec<usize> {
    if parts < 1 {
        return Vec::new();
    }

    let quotient = total / parts;
    let remainder = total % parts;

    (0..parts)
        .map(|i| if i < remainder { quotient + 1 } else { quotient })
        .collect()
}

/// Returns the elements of `x` which don't occur in `y`, in the order they appear in `x`.
///
/// Quadratic, which is fine at bucket scale.
pub fn relative_complement<T: PartialEq + Clone>(x: &[T], y: &[T]) -> Vec<T> {
    x.iter().filter(|item| !y.contains(item)).cloned().collect()
}
