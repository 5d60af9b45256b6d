//! Interaction term expansion.
//!
//! Expands a list of values into every combination of them, the way a model
//! builder expands main effects into interaction terms. For `n` distinct
//! values the unrestricted expansion yields all `2^n - 1` non-empty subsets.
//!
//! The result is ordered for direct display: combinations are grouped by
//! ascending length, and within a length group they appear in the order
//! their first differing factor was encountered. For `[a, b, c]` the
//! unrestricted expansion is:
//!
//! ```text
//! [a], [b], [c], [a, b], [a, c], [b, c], [a, b, c]
//! ```

/// All combinations of `values` with lengths in `min_len ..= max_len`
/// (unbounded above when `max_len` is `None`), grouped by ascending length.
///
/// A value already present in a combination is never added to it again, so
/// duplicate input values produce no self-interactions.
pub fn interactions<T>(values: &[T], min_len: usize, max_len: Option<usize>) -> Vec<Vec<T>>
where
    T: Clone + PartialEq,
{
    let mut list: Vec<Vec<T>> = Vec::new();
    // counts[k] = combinations of length k + 1 currently in the list
    let mut counts: Vec<usize> = vec![0];
    let position = |counts: &[usize], length: usize| -> usize {
        counts.iter().take(length).sum()
    };

    for (i, value) in values.iter().enumerate() {
        // the window grows as combinations are inserted, so supersets
        // created in this pass are still visited (and skipped)
        let mut window = list.len();
        let mut j = 0;
        while j < window {
            // the list is grouped by ascending length, so once a
            // combination saturates max_len the rest would too
            if max_len.is_some_and(|max| list[j].len() == max) {
                break;
            }
            if list[j].contains(value) {
                j += 1;
                continue;
            }

            let mut combined = list[j].clone();
            combined.push(value.clone());
            let new_len = combined.len();
            if counts.len() < new_len {
                counts.resize(new_len, 0);
            }
            let at = position(&counts, new_len);
            list.insert(at, combined);
            counts[new_len - 1] += 1;
            window += 1;
            j += 1;
        }

        // singletons land at the end of the length-1 group
        list.insert(i, vec![value.clone()]);
        counts[0] += 1;
    }

    if min_len > 1 {
        let cut = position(&counts, min_len - 1);
        list.drain(..cut);
    }
    list
}
