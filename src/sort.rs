//! Sorting stages.
//!
//! A sort cannot emit anything before it has seen the whole upstream, so
//! every sorting operation is a *deferred* stage: nothing is pulled until
//! the first element is requested downstream, at which point upstream is
//! buffered, arranged, and replayed.

use std::cmp::Ordering;

use crate::stream::Pipe;

/// Wraps `upstream` in a stage that buffers it on first pull and replays
/// `arrange(buffer)`.
pub(crate) fn deferred<'a, T, F>(
    upstream: Pipe<'a, T>,
    arrange: F,
) -> impl Iterator<Item = T> + Send + 'a
where
    T: Send + 'a,
    F: FnOnce(Vec<T>) -> Vec<T> + Send + 'a,
{
    let mut pending = Some((upstream, arrange));
    let mut buffered: Option<std::vec::IntoIter<T>> = None;
    std::iter::from_fn(move || {
        if let Some((upstream, arrange)) = pending.take() {
            buffered = Some(arrange(upstream.collect()).into_iter());
        }
        buffered.as_mut()?.next()
    })
}

/// Stable sort of `items` by a derived key, computing each key exactly once.
///
/// Keys are paired with their elements, the pairs are sorted stably by
/// `compare` on the key, and the keys are dropped.
///
/// # Complexity
/// Time: O(n log n) comparisons, n key evaluations. Space: O(n)
///
/// # Examples
/// ```
/// use u_numstream::sort::sort_by_derived_key;
/// let sorted = sort_by_derived_key(vec![5, 10, 11, 6], |x| x.to_string(), Ord::cmp);
/// assert_eq!(sorted, vec![10, 11, 5, 6]);
/// ```
pub fn sort_by_derived_key<T, K, F, C>(items: Vec<T>, mut key: F, compare: C) -> Vec<T>
where
    F: FnMut(&T) -> K,
    C: Fn(&K, &K) -> Ordering,
{
    let mut keyed: Vec<(K, T)> = items.into_iter().map(|x| (key(&x), x)).collect();
    keyed.sort_by(|a, b| compare(&a.0, &b.0));
    keyed.into_iter().map(|(_, x)| x).collect()
}
