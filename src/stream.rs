//! The lazy, single-use numeric stream.
//!
//! A [`NumStream`] is a pull pipeline: a boxed iterator that every
//! intermediate operation wraps in one more stage. Nothing is evaluated
//! until a terminal operation pulls from the end of the pipeline.
//!
//! # Single use
//!
//! Every operation takes the stream by value, so a stream that has been
//! transformed or evaluated cannot be touched again. The one invalid state
//! reachable at run time is a stream released with [`NumStream::close`]:
//! intermediate operations carry the closed state forward and the terminal
//! operation fails with [`StreamError::Closed`].
//!
//! # Parallel mode
//!
//! In parallel mode the order-insensitive terminal operations (`count`,
//! `sum`, `min`, `max`, `average`, `summary_statistics`, the match
//! operations, `has` and `find_any`) are fanned out over rayon. Operations
//! whose result depends on encounter order always evaluate in order.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Range, RangeInclusive};

use rayon::iter::{ParallelBridge, ParallelIterator};
use tracing::trace;

use crate::close::CloseHandlers;
use crate::config::StreamConfig;
use crate::element::Element;
use crate::error::{Result, StreamError};
use crate::sort::{deferred, sort_by_derived_key};
use crate::stats::{Summation, SummaryStatistics, Total};

pub(crate) type Pipe<'a, T> = Box<dyn Iterator<Item = T> + Send + 'a>;

/// A lazy, possibly infinite, single-use stream of `i32`, `i64` or `f64`.
///
/// # Examples
/// ```
/// use u_numstream::NumStream;
/// let v = NumStream::of([3, 1, 2, 3])
///     .distinct()
///     .sorted()
///     .prepend([0])
///     .to_vec()
///     .unwrap();
/// assert_eq!(v, vec![0, 1, 2, 3]);
/// ```
pub struct NumStream<'a, T: Element> {
    /// `None` once the stream has been closed.
    pipe: Option<Pipe<'a, T>>,
    config: StreamConfig,
    on_close: CloseHandlers<'a>,
}

// ============================================================================
// Construction
// ============================================================================

impl<'a, T: Element> NumStream<'a, T> {
    pub(crate) fn from_pipe(pipe: Pipe<'a, T>) -> Self {
        Self {
            pipe: Some(pipe),
            config: StreamConfig::default(),
            on_close: CloseHandlers::new(),
        }
    }

    /// A stream with no elements.
    pub fn empty() -> Self {
        Self::from_pipe(Box::new(std::iter::empty()))
    }

    /// A stream over `values`, in their iteration order.
    ///
    /// Accepts arrays, vectors, ranges and lazy iterators alike; lazy
    /// iterators stay lazy.
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'a,
    {
        Self::from_pipe(Box::new(values.into_iter()))
    }

    /// Returns `stream` itself: already a `NumStream`, nothing to wrap.
    pub fn of_stream(stream: NumStream<'a, T>) -> Self {
        stream
    }

    /// The infinite stream `seed, f(seed), f(f(seed)), …`.
    ///
    /// `f` runs only when the next element is actually pulled, so
    /// `iterate(seed, f).limit(n)` calls it exactly `n - 1` times. Bound the
    /// stream (e.g. with [`limit`](Self::limit)) before a terminal operation
    /// that consumes everything.
    ///
    /// # Examples
    /// ```
    /// use u_numstream::NumStream;
    /// let powers = NumStream::iterate(1, |x| x * 2).limit(5).to_vec().unwrap();
    /// assert_eq!(powers, vec![1, 2, 4, 8, 16]);
    /// ```
    pub fn iterate<F>(seed: T, mut f: F) -> Self
    where
        F: FnMut(T) -> T + Send + 'a,
    {
        let mut previous: Option<T> = None;
        Self::from_pipe(Box::new(std::iter::from_fn(move || {
            let next = match previous {
                None => seed,
                Some(prev) => f(prev),
            };
            previous = Some(next);
            Some(next)
        })))
    }

    /// The infinite stream of values returned by `supplier`.
    pub fn generate<F>(supplier: F) -> Self
    where
        F: FnMut() -> T + Send + 'a,
    {
        Self::from_pipe(Box::new(std::iter::repeat_with(supplier)))
    }
}

impl<'a, T> NumStream<'a, T>
where
    T: Element,
    Range<T>: Iterator<Item = T>,
    RangeInclusive<T>: Iterator<Item = T>,
{
    /// `start, start + 1, …, end - 1`; empty when `start >= end`.
    pub fn range(start: T, end: T) -> Self {
        Self::of(start..end)
    }

    /// `start, start + 1, …, end`; empty when `start > end`.
    pub fn range_closed(start: T, end: T) -> Self {
        Self::of(start..=end)
    }
}

impl<'a, T: Element> FromIterator<T> for NumStream<'a, T> {
    /// Collects `iter` eagerly; use [`NumStream::of`] to stay lazy.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a, T: Element> From<Vec<T>> for NumStream<'a, T> {
    fn from(values: Vec<T>) -> Self {
        Self::of(values)
    }
}

// ============================================================================
// Intermediate operations
// ============================================================================

impl<'a, T: Element> NumStream<'a, T> {
    fn stage<U, I, F>(self, f: F) -> NumStream<'a, U>
    where
        U: Element,
        I: Iterator<Item = U> + Send + 'a,
        F: FnOnce(Pipe<'a, T>) -> I,
    {
        NumStream {
            pipe: self.pipe.map(|pipe| Box::new(f(pipe)) as Pipe<'a, U>),
            config: self.config,
            on_close: self.on_close,
        }
    }

    /// Applies `f` to every element.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(T) -> T + Send + 'a,
    {
        self.stage(|pipe| pipe.map(f))
    }

    /// Applies `f` to every element, producing a stream of another kind.
    ///
    /// # Examples
    /// ```
    /// use u_numstream::NumStream;
    /// let halves = NumStream::range(1, 4).map_to(|x| f64::from(x) / 2.0).to_vec().unwrap();
    /// assert_eq!(halves, vec![0.5, 1.0, 1.5]);
    /// ```
    pub fn map_to<U, F>(self, f: F) -> NumStream<'a, U>
    where
        U: Element,
        F: FnMut(T) -> U + Send + 'a,
    {
        self.stage(|pipe| pipe.map(f))
    }

    /// Keeps the elements matching `predicate`.
    pub fn filter<P>(self, mut predicate: P) -> Self
    where
        P: FnMut(T) -> bool + Send + 'a,
    {
        self.stage(|pipe| pipe.filter(move |x| predicate(*x)))
    }

    /// Drops the elements matching `predicate`; the complement of
    /// [`filter`](Self::filter).
    pub fn remove<P>(self, mut predicate: P) -> Self
    where
        P: FnMut(T) -> bool + Send + 'a,
    {
        self.filter(move |x| !predicate(x))
    }

    /// Calls `action` on every element as it flows past.
    pub fn peek<F>(self, mut action: F) -> Self
    where
        F: FnMut(T) + Send + 'a,
    {
        self.stage(|pipe| pipe.inspect(move |x| action(*x)))
    }

    /// Drops repeated elements, keeping the first occurrence of each.
    pub fn distinct(self) -> Self {
        self.stage(|pipe| {
            let mut seen = HashSet::new();
            pipe.filter(move |x| seen.insert(x.identity_bits()))
        })
    }

    /// Sorts in ascending natural order.
    pub fn sorted(self) -> Self {
        self.stage(|pipe| {
            deferred(pipe, |mut v| {
                v.sort_by(T::compare);
                v
            })
        })
    }

    /// Sorts in descending natural order.
    pub fn reverse_sorted(self) -> Self {
        self.stage(|pipe| {
            deferred(pipe, |mut v| {
                v.sort_by(|a, b| b.compare(a));
                v
            })
        })
    }

    /// Stable ascending sort by a key derived from each element.
    ///
    /// The key is computed once per element, not once per comparison.
    ///
    /// # Examples
    /// ```
    /// use u_numstream::NumStream;
    /// let v = NumStream::range(5, 12).sorted_by(|x| x.to_string()).to_vec().unwrap();
    /// assert_eq!(v, vec![10, 11, 5, 6, 7, 8, 9]);
    /// ```
    pub fn sorted_by<K, F>(self, mut key: F) -> Self
    where
        K: Ord,
        F: FnMut(T) -> K + Send + 'a,
    {
        self.stage(|pipe| {
            deferred(pipe, move |v| sort_by_derived_key(v, |x| key(*x), Ord::cmp))
        })
    }

    /// [`sorted_by`](Self::sorted_by) with an `i32` key.
    pub fn sorted_by_int<F>(self, key: F) -> Self
    where
        F: FnMut(T) -> i32 + Send + 'a,
    {
        self.sorted_by(key)
    }

    /// [`sorted_by`](Self::sorted_by) with an `i64` key.
    pub fn sorted_by_long<F>(self, key: F) -> Self
    where
        F: FnMut(T) -> i64 + Send + 'a,
    {
        self.sorted_by(key)
    }

    /// Stable ascending sort by an `f64` key, in the same order as
    /// [`sorted`](Self::sorted) uses for doubles (NaN keys last).
    pub fn sorted_by_double<F>(self, mut key: F) -> Self
    where
        F: FnMut(T) -> f64 + Send + 'a,
    {
        self.stage(|pipe| {
            deferred(pipe, move |v| {
                sort_by_derived_key(v, |x| key(*x), <f64 as Element>::compare)
            })
        })
    }

    /// Truncates to at most `n` elements. Upstream is not pulled past the
    /// `n`-th element, so this bounds infinite sources.
    pub fn limit(self, n: usize) -> Self {
        self.stage(|pipe| pipe.take(n))
    }

    /// Discards the first `n` elements.
    pub fn skip(self, n: usize) -> Self {
        self.stage(|pipe| pipe.skip(n))
    }

    /// Emits `values` before this stream's elements.
    pub fn prepend<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'a,
    {
        self.stage(|pipe| values.into_iter().chain(pipe))
    }

    /// Emits `values` after this stream's elements.
    pub fn append<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'a,
    {
        self.stage(|pipe| pipe.chain(values))
    }

    /// Emits `other`'s elements, then this stream's.
    ///
    /// The result owns both streams' close handlers, this stream's first.
    pub fn prepend_stream(self, other: NumStream<'a, T>) -> Self {
        self.concat(other, true)
    }

    /// Emits this stream's elements, then `other`'s.
    ///
    /// The result owns both streams' close handlers, this stream's first.
    pub fn append_stream(self, other: NumStream<'a, T>) -> Self {
        self.concat(other, false)
    }

    fn concat(mut self, mut other: NumStream<'a, T>, other_first: bool) -> Self {
        self.on_close.append(std::mem::take(&mut other.on_close));
        let pipe: Option<Pipe<'a, T>> = match (self.pipe.take(), other.pipe.take()) {
            (Some(own), Some(theirs)) if other_first => Some(Box::new(theirs.chain(own))),
            (Some(own), Some(theirs)) => Some(Box::new(own.chain(theirs))),
            _ => None,
        };
        Self {
            pipe,
            config: self.config,
            on_close: self.on_close,
        }
    }
}

impl<'a> NumStream<'a, i32> {
    /// The same elements widened to `i64`.
    pub fn as_long_stream(self) -> NumStream<'a, i64> {
        self.map_to(i64::from)
    }

}

impl<'a, T: Element> NumStream<'a, T> {
    /// The same elements converted to `f64` (`i64` values round beyond
    /// 2⁵³).
    pub fn as_double_stream(self) -> NumStream<'a, f64> {
        self.map_to(T::to_f64)
    }
}

// ============================================================================
// Mode and lifecycle
// ============================================================================

impl<'a, T: Element> NumStream<'a, T> {
    /// Switches to parallel evaluation.
    pub fn parallel(mut self) -> Self {
        self.config.set_parallel(true);
        self
    }

    /// Switches to sequential evaluation.
    pub fn sequential(mut self) -> Self {
        self.config.set_parallel(false);
        self
    }

    /// Whether a terminal operation would evaluate in parallel.
    pub fn is_parallel(&self) -> bool {
        self.config.is_parallel()
    }

    /// Replaces the evaluation settings.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers `handler` to run when the stream is released.
    ///
    /// Handlers run exactly once, in registration order, when a terminal
    /// operation finishes, when the stream's [`iterator`](Self::iterator)
    /// is exhausted or dropped, on [`close`](Self::close), or when the
    /// stream is dropped (also while unwinding from a panic).
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() + Send + 'a,
    {
        self.on_close.push(handler);
        self
    }

    /// Releases the pipeline and runs the close handlers.
    ///
    /// Afterwards every terminal operation on this stream, or on a stream
    /// derived from it, fails with [`StreamError::Closed`]. Closing twice is
    /// a no-op.
    pub fn close(&mut self) {
        self.pipe = None;
        self.on_close.run();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.pipe.is_none()
    }
}

impl<T: Element> fmt::Debug for NumStream<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumStream")
            .field("kind", &T::KIND)
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .field("on_close", &self.on_close)
            .finish()
    }
}

// ============================================================================
// Terminal operations
// ============================================================================

impl<'a, T: Element> NumStream<'a, T> {
    fn evaluate<R, F>(self, operation: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(Pipe<'a, T>, &StreamConfig) -> R,
    {
        let NumStream {
            pipe,
            config,
            mut on_close,
        } = self;
        let pipe = pipe.ok_or(StreamError::Closed { operation })?;
        trace!(
            operation,
            kind = T::KIND,
            parallel = config.is_parallel(),
            "evaluating stream"
        );
        let result = f(pipe, &config);
        on_close.run();
        Ok(result)
    }

    /// Collects every element, in encounter order.
    pub fn to_vec(self) -> Result<Vec<T>> {
        self.evaluate("to_vec", |pipe, _| pipe.collect())
    }

    /// Calls `action` on every element, in encounter order.
    pub fn for_each<F>(self, action: F) -> Result<()>
    where
        F: FnMut(T),
    {
        self.evaluate("for_each", |pipe, _| pipe.for_each(action))
    }

    /// Folds the elements left to right with `op`; `None` when empty.
    pub fn reduce<F>(self, op: F) -> Result<Option<T>>
    where
        F: FnMut(T, T) -> T,
    {
        self.evaluate("reduce", |pipe, _| pipe.reduce(op))
    }

    /// Sum of the elements: a wrapping `i64` for integer kinds, a
    /// compensated `f64` for floats.
    pub fn sum(self) -> Result<Total<T>> {
        self.evaluate("sum", |pipe, config| {
            let acc = if config.is_parallel() {
                config.install(|| {
                    pipe.par_bridge()
                        .fold(T::Sum::default, |mut acc, x| {
                            acc.add(x);
                            acc
                        })
                        .reduce(T::Sum::default, |mut a, b| {
                            a.merge(&b);
                            a
                        })
                })
            } else {
                pipe.fold(T::Sum::default(), |mut acc, x| {
                    acc.add(x);
                    acc
                })
            };
            acc.total()
        })
    }

    /// Smallest element; `None` when empty.
    pub fn min(self) -> Result<Option<T>> {
        self.extreme("min", T::lesser)
    }

    /// Largest element; `None` when empty.
    pub fn max(self) -> Result<Option<T>> {
        self.extreme("max", T::greater)
    }

    fn extreme(self, operation: &'static str, pick: fn(T, T) -> T) -> Result<Option<T>> {
        self.evaluate(operation, |pipe, config| {
            if config.is_parallel() {
                config.install(|| pipe.par_bridge().reduce_with(pick))
            } else {
                pipe.reduce(pick)
            }
        })
    }

    /// Arithmetic mean; `None` when empty.
    pub fn average(self) -> Result<Option<f64>> {
        Ok(self.statistics("average")?.average())
    }

    /// Number of elements.
    pub fn count(self) -> Result<u64> {
        self.evaluate("count", |pipe, config| {
            if config.is_parallel() {
                config.install(|| pipe.par_bridge().count() as u64)
            } else {
                pipe.count() as u64
            }
        })
    }

    /// Count, sum, min, max, average and variance in one pass.
    pub fn summary_statistics(self) -> Result<SummaryStatistics<T>> {
        self.statistics("summary_statistics")
    }

    fn statistics(self, operation: &'static str) -> Result<SummaryStatistics<T>> {
        self.evaluate(operation, |pipe, config| {
            if config.is_parallel() {
                config.install(|| {
                    pipe.par_bridge()
                        .fold(SummaryStatistics::new, |mut stats, x| {
                            stats.accept(x);
                            stats
                        })
                        .reduce(SummaryStatistics::new, |mut a, b| {
                            a.combine(&b);
                            a
                        })
                })
            } else {
                pipe.collect()
            }
        })
    }

    /// The first element; `None` when empty.
    pub fn first(self) -> Result<Option<T>> {
        self.evaluate("first", |mut pipe, _| pipe.next())
    }

    /// The first element, in encounter order, matching `predicate`.
    pub fn find_first<P>(self, mut predicate: P) -> Result<Option<T>>
    where
        P: FnMut(T) -> bool,
    {
        self.evaluate("find_first", |mut pipe, _| pipe.find(|x| predicate(*x)))
    }

    /// Some element matching `predicate`.
    ///
    /// Sequentially this is the first match; in parallel mode it is
    /// whichever match a worker finds first.
    pub fn find_any<P>(self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(T) -> bool + Send + Sync,
    {
        self.evaluate("find_any", |mut pipe, config| {
            if config.is_parallel() {
                config.install(|| pipe.par_bridge().find_any(|x| predicate(*x)))
            } else {
                pipe.find(|x| predicate(*x))
            }
        })
    }

    /// Whether any element matches `predicate`; stops at the first match.
    pub fn any_match<P>(self, predicate: P) -> Result<bool>
    where
        P: Fn(T) -> bool + Send + Sync,
    {
        self.any_where("any_match", predicate)
    }

    /// Whether every element matches `predicate`; `true` when empty.
    pub fn all_match<P>(self, predicate: P) -> Result<bool>
    where
        P: Fn(T) -> bool + Send + Sync,
    {
        Ok(!self.any_where("all_match", |x| !predicate(x))?)
    }

    /// Whether no element matches `predicate`; `true` when empty.
    pub fn none_match<P>(self, predicate: P) -> Result<bool>
    where
        P: Fn(T) -> bool + Send + Sync,
    {
        Ok(!self.any_where("none_match", predicate)?)
    }

    /// Whether the stream contains `value`.
    pub fn has(self, value: T) -> Result<bool> {
        self.any_where("has", move |x| x == value)
    }

    fn any_where<P>(self, operation: &'static str, predicate: P) -> Result<bool>
    where
        P: Fn(T) -> bool + Send + Sync,
    {
        self.evaluate(operation, |mut pipe, config| {
            if config.is_parallel() {
                config.install(|| pipe.par_bridge().any(|x| predicate(x)))
            } else {
                pipe.any(|x| predicate(x))
            }
        })
    }

    /// Hands the pipeline over as a plain iterator.
    ///
    /// Close handlers run when the iterator is exhausted or dropped,
    /// whichever happens first.
    pub fn iterator(self) -> Result<StreamIter<'a, T>> {
        let NumStream { pipe, on_close, .. } = self;
        let pipe = pipe.ok_or(StreamError::Closed {
            operation: "iterator",
        })?;
        trace!(kind = T::KIND, "stream handed over as iterator");
        Ok(StreamIter {
            pipe: Some(pipe),
            on_close,
        })
    }
}

/// Iterator returned by [`NumStream::iterator`].
pub struct StreamIter<'a, T> {
    pipe: Option<Pipe<'a, T>>,
    on_close: CloseHandlers<'a>,
}

impl<T> Iterator for StreamIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let next = self.pipe.as_mut()?.next();
        if next.is_none() {
            self.pipe = None;
            self.on_close.run();
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pipe.as_ref().map_or((0, Some(0)), |p| p.size_hint())
    }
}

impl<T> fmt::Debug for StreamIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamIter")
            .field("exhausted", &self.pipe.is_none())
            .field("on_close", &self.on_close)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(c: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let c = Arc::clone(c);
        move || {
            c.fetch_add(1, Ordering::SeqCst);
        }
    }

    // --- laziness ---

    #[test]
    fn test_intermediate_ops_are_lazy() {
        let pulled = counter();
        let p = Arc::clone(&pulled);
        let stream = NumStream::range(0, 10).peek(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        });
        let stream = stream.map(|x| x + 1).filter(|x| x % 2 == 0);
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        assert_eq!(stream.to_vec().unwrap(), vec![2, 4, 6, 8, 10]);
        assert_eq!(pulled.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_limit_stops_pulling_upstream() {
        let pulled = counter();
        let p = Arc::clone(&pulled);
        let v = NumStream::generate(move || p.fetch_add(1, Ordering::SeqCst) as i64)
            .limit(3)
            .to_vec()
            .unwrap();
        assert_eq!(v, vec![0, 1, 2]);
        assert_eq!(pulled.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_iterate_calls_step_only_when_pulled() {
        let calls = counter();
        let c = Arc::clone(&calls);
        let v = NumStream::iterate(1, move |x| {
            c.fetch_add(1, Ordering::SeqCst);
            x * 2
        })
        .limit(5)
        .to_vec()
        .unwrap();
        assert_eq!(v, vec![1, 2, 4, 8, 16]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    // --- lifecycle ---

    #[test]
    fn test_closed_stream_rejects_terminal_ops() {
        let mut stream = NumStream::of([1, 2, 3]);
        stream.close();
        assert!(stream.is_closed());
        let err = stream.map(|x| x * 2).sum().unwrap_err();
        assert!(matches!(err, StreamError::Closed { operation: "sum" }));
    }

    #[test]
    fn test_closed_stream_rejects_iterator() {
        let mut stream = NumStream::<f64>::empty();
        stream.close();
        assert!(matches!(
            stream.iterator().unwrap_err(),
            StreamError::Closed { operation: "iterator" }
        ));
    }

    #[test]
    fn test_close_runs_handlers_once() {
        let closed = counter();
        let mut stream = NumStream::of([1]).on_close(bump(&closed));
        stream.close();
        stream.close();
        drop(stream);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_terminal_op_runs_handlers_in_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&log), Arc::clone(&log));
        let count = NumStream::of([1, 2])
            .on_close(move || a.lock().unwrap().push("first"))
            .map(|x| x + 1)
            .on_close(move || b.lock().unwrap().push("second"))
            .count()
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_dropped_stream_runs_handlers() {
        let closed = counter();
        let stream = NumStream::of([1, 2, 3]).on_close(bump(&closed));
        drop(stream);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handlers_run_when_user_closure_panics() {
        let closed = counter();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            NumStream::of([1, 2, 3])
                .on_close(bump(&closed))
                .map(|x| if x == 2 { panic!("boom") } else { x })
                .to_vec()
        }));
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_iterator_runs_handlers_on_exhaustion() {
        let closed = counter();
        let mut it = NumStream::of([1, 2]).on_close(bump(&closed)).iterator().unwrap();
        assert_eq!(it.next(), Some(1));
        assert_eq!(closed.load(Ordering::SeqCst), 0);
        assert_eq!(it.next(), Some(2));
        assert_eq!(it.next(), None);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(it.next(), None);
        drop(it);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_iterator_early_release_runs_handlers() {
        let closed = counter();
        let mut it = NumStream::range(0, 100).on_close(bump(&closed)).iterator().unwrap();
        assert_eq!(it.next(), Some(0));
        drop(it);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_of_stream_is_passthrough() {
        let closed = counter();
        let original = NumStream::of([1, 2, 3]).parallel().on_close(bump(&closed));
        let same = NumStream::of_stream(original);
        assert!(same.is_parallel());
        assert_eq!(same.to_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concat_keeps_both_handler_sets() {
        let closed = counter();
        let head = NumStream::of([1, 2]).on_close(bump(&closed));
        let tail = NumStream::of([3]).on_close(bump(&closed));
        assert_eq!(head.append_stream(tail).to_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(closed.load(Ordering::SeqCst), 2);

        let v = NumStream::of([3]).prepend_stream(NumStream::of([1, 2])).to_vec().unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_concat_with_closed_stream_is_closed() {
        let mut closed = NumStream::of([1]);
        closed.close();
        let joined = NumStream::of([0]).append_stream(closed);
        assert!(joined.is_closed());
        assert!(joined.to_vec().is_err());
    }

    // --- mode ---

    #[test]
    fn test_parallel_toggle() {
        assert!(!NumStream::of([1]).is_parallel());
        assert!(NumStream::of([1]).parallel().is_parallel());
        assert!(!NumStream::of([1]).parallel().sequential().is_parallel());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seq = NumStream::range(-500, 500).map(|x| x * 3).summary_statistics().unwrap();
        let par = NumStream::range(-500, 500)
            .map(|x| x * 3)
            .parallel()
            .summary_statistics()
            .unwrap();
        assert_eq!(par.count(), seq.count());
        assert_eq!(par.sum(), seq.sum());
        assert_eq!(par.min(), seq.min());
        assert_eq!(par.max(), seq.max());

        assert_eq!(NumStream::range(0, 1000).parallel().sum().unwrap(), 499_500_i64);
        assert_eq!(NumStream::range(0, 1000).parallel().count().unwrap(), 1000);
        assert_eq!(NumStream::range(0, 1000).parallel().min().unwrap(), Some(0));
        assert_eq!(NumStream::range(0, 1000).parallel().max().unwrap(), Some(999));
        assert!(NumStream::range(0, 1000).parallel().has(777).unwrap());
        assert!(NumStream::range(0, 1000).parallel().all_match(|x| x >= 0).unwrap());
    }

    #[test]
    fn test_parallel_order_sensitive_ops_keep_order() {
        let v = NumStream::range(0, 1000).parallel().filter(|x| x % 7 == 0).to_vec().unwrap();
        assert_eq!(v, (0..1000).filter(|x| x % 7 == 0).collect::<Vec<_>>());
        let first = NumStream::range(0, 1000).parallel().find_first(|x| x > 500).unwrap();
        assert_eq!(first, Some(501));
    }

    #[test]
    fn test_parallel_find_any_returns_a_match() {
        let found = NumStream::range(0, 10_000)
            .parallel()
            .find_any(|x| x % 1000 == 999)
            .unwrap()
            .unwrap();
        assert_eq!(found % 1000, 999);
    }

    #[test]
    fn test_dedicated_pool() {
        let config = StreamConfig::new().parallel(true).with_threads(2).unwrap();
        let stats = NumStream::range(1_i64, 101)
            .with_config(config)
            .summary_statistics()
            .unwrap();
        assert_eq!(stats.sum(), 5050);
        assert_eq!(stats.average(), Some(50.5));
    }

    // --- terminals ---

    #[test]
    fn test_empty_terminals_are_absent() {
        assert_eq!(NumStream::<i32>::empty().min().unwrap(), None);
        assert_eq!(NumStream::<i64>::empty().max().unwrap(), None);
        assert_eq!(NumStream::<f64>::empty().average().unwrap(), None);
        assert_eq!(NumStream::<i32>::empty().first().unwrap(), None);
        assert_eq!(NumStream::<i32>::empty().find_any(|_| true).unwrap(), None);
        assert_eq!(NumStream::<i32>::empty().reduce(|a, b| a + b).unwrap(), None);
        assert_eq!(NumStream::<i32>::empty().sum().unwrap(), 0);
        assert!(NumStream::<i32>::empty().all_match(|_| false).unwrap());
        assert!(NumStream::<i32>::empty().none_match(|_| true).unwrap());
    }

    #[test]
    fn test_float_terminals() {
        let v = NumStream::of([0.5, -0.0, 0.0, 2.5, 0.5]).distinct().to_vec().unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(NumStream::of([1.0, 1e100, 1.0, -1e100]).sum().unwrap(), 2.0);
        assert_eq!(NumStream::of([3.0, -1.5]).min().unwrap(), Some(-1.5));
        assert!(NumStream::of([3.0, f64::NAN]).max().unwrap().unwrap().is_nan());
        assert!(!NumStream::of([f64::NAN]).has(f64::NAN).unwrap());
        let sorted = NumStream::of([2.0, f64::NAN, -1.0]).sorted().to_vec().unwrap();
        assert_eq!(&sorted[..2], &[-1.0, 2.0]);
        assert!(sorted[2].is_nan());
    }

    #[test]
    fn test_every_nan_sorts_last() {
        let sorted = NumStream::of([-f64::NAN, 1.0, f64::NEG_INFINITY])
            .sorted()
            .to_vec()
            .unwrap();
        assert_eq!(&sorted[..2], &[f64::NEG_INFINITY, 1.0]);
        assert!(sorted[2].is_nan());

        let reversed = NumStream::of([1.0, -f64::NAN, 2.0]).reverse_sorted().to_vec().unwrap();
        assert!(reversed[0].is_nan());
        assert_eq!(&reversed[1..], &[2.0, 1.0]);

        let by_key = NumStream::range(0, 3)
            .sorted_by_double(|i| if i == 0 { -f64::NAN } else { -f64::from(i) })
            .to_vec()
            .unwrap();
        assert_eq!(by_key, vec![2, 1, 0]);
    }

    #[test]
    fn test_for_each_and_reduce() {
        let mut seen = Vec::new();
        NumStream::of([3, 1, 2]).for_each(|x| seen.push(x)).unwrap();
        assert_eq!(seen, vec![3, 1, 2]);
        assert_eq!(NumStream::range(1, 6).reduce(|a, b| a * b).unwrap(), Some(120));
    }

    #[test]
    fn test_borrowing_sources() {
        let data = vec![4_i64, 9, 16];
        let doubled = NumStream::of(data.iter().copied()).map(|x| x * 2).to_vec().unwrap();
        assert_eq!(doubled, vec![8, 18, 32]);
        let collected: NumStream<'_, i32> = (1..=3).collect();
        assert_eq!(collected.count().unwrap(), 3);
        assert_eq!(NumStream::from(vec![7, 8]).first().unwrap(), Some(7));
    }
}
