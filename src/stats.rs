//! Running accumulators behind `sum`, `average` and `summary_statistics`.
//!
//! Every accumulator here is single-pass, O(1) in memory, and mergeable, so
//! the parallel evaluation path can fold one accumulator per worker and
//! combine them afterwards.
//!
//! # Algorithms
//!
//! - **Integer sums**: accumulated in a wrapping `i64`. An `i32` stream
//!   cannot overflow it in practice; an `i64` stream wraps.
//! - **Float sums**: Neumaier compensated summation for O(ε) error
//!   independent of `n`.
//!   Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
//!   zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
//! - **Variance**: Welford's online algorithm, merged with Chan's formula.
//!   Reference: Welford (1962), *Technometrics* 4(3), pp. 419–420;
//!   Chan, Golub & LeVeque (1979), "Updating Formulae and a Pairwise
//!   Algorithm for Computing Sample Variances".

use std::fmt;

use crate::element::Element;

/// Result type of [`NumStream::sum`](crate::NumStream::sum) for element kind `T`.
///
/// `i64` for both integer kinds, `f64` for floats.
pub type Total<T> = <<T as Element>::Sum as Summation<T>>::Output;

/// A mergeable running sum over elements of kind `T`.
pub trait Summation<T>: Clone + Default + fmt::Debug + Send {
    /// The value reported by [`total`](Summation::total).
    type Output: Copy + fmt::Debug + fmt::Display + PartialEq + Send;

    /// Adds one element.
    fn add(&mut self, value: T);

    /// Folds another partial sum into this one.
    fn merge(&mut self, other: &Self);

    /// Returns the accumulated sum.
    fn total(&self) -> Self::Output;

    /// Returns the accumulated sum as `f64`, used for averages.
    fn total_f64(&self) -> f64;
}

// ---------------------------------------------------------------------------
// Integer summation
// ---------------------------------------------------------------------------

/// Wrapping `i64` accumulator used by `i32` and `i64` streams.
///
/// # Examples
/// ```
/// use u_numstream::stats::{Summation, WideSum};
/// let mut acc = WideSum::default();
/// Summation::<i32>::add(&mut acc, i32::MAX);
/// Summation::<i32>::add(&mut acc, i32::MAX);
/// assert_eq!(Summation::<i32>::total(&acc), 2 * i32::MAX as i64);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WideSum {
    total: i64,
}

impl Summation<i32> for WideSum {
    type Output = i64;

    fn add(&mut self, value: i32) {
        self.total = self.total.wrapping_add(i64::from(value));
    }

    fn merge(&mut self, other: &Self) {
        self.total = self.total.wrapping_add(other.total);
    }

    fn total(&self) -> i64 {
        self.total
    }

    fn total_f64(&self) -> f64 {
        self.total as f64
    }
}

impl Summation<i64> for WideSum {
    type Output = i64;

    fn add(&mut self, value: i64) {
        self.total = self.total.wrapping_add(value);
    }

    fn merge(&mut self, other: &Self) {
        self.total = self.total.wrapping_add(other.total);
    }

    fn total(&self) -> i64 {
        self.total
    }

    fn total_f64(&self) -> f64 {
        self.total as f64
    }
}

// ---------------------------------------------------------------------------
// Compensated float summation
// ---------------------------------------------------------------------------

/// Neumaier compensated accumulator used by `f64` streams.
///
/// An improved variant of Kahan summation that also handles the case where
/// the addend is larger in magnitude than the running sum.
///
/// A naive running sum is kept alongside: when infinities make the
/// compensated result NaN, the (infinite) naive sum is reported instead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
    naive: f64,
}

impl CompensatedSum {
    fn add_term(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }
}

impl Summation<f64> for CompensatedSum {
    type Output = f64;

    fn add(&mut self, value: f64) {
        self.add_term(value);
        self.naive += value;
    }

    fn merge(&mut self, other: &Self) {
        self.add_term(other.sum);
        self.compensation += other.compensation;
        self.naive += other.naive;
    }

    fn total(&self) -> f64 {
        let t = self.sum + self.compensation;
        if t.is_nan() && self.naive.is_infinite() {
            self.naive
        } else {
            t
        }
    }

    fn total_f64(&self) -> f64 {
        Summation::<f64>::total(self)
    }
}

/// Sums a slice with [`CompensatedSum`].
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Examples
/// ```
/// use u_numstream::stats::kahan_sum;
/// let data = [1.0, 1e100, 1.0, -1e100];
/// assert_eq!(kahan_sum(&data), 2.0);
/// ```
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut acc = CompensatedSum::default();
    for &x in data {
        acc.add(x);
    }
    acc.total()
}

// ---------------------------------------------------------------------------
// Welford moments
// ---------------------------------------------------------------------------

/// Running mean and sum of squared deviations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;

        if n1 == 0 {
            self.mean = value;
            return;
        }

        let n = self.count as f64;
        let delta = value - self.mean;
        let delta_n = delta / n;
        self.m2 += delta * delta_n * n1 as f64;
        self.mean += delta_n;
    }

    fn merge(&mut self, other: &Moments) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let total = self.count + other.count;
        let n = total as f64;
        let delta = other.mean - self.mean;

        self.mean += delta * (nb / n);
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count = total;
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Count, sum, min, max, average and variance gathered in one pass.
///
/// # Examples
/// ```
/// use u_numstream::stats::SummaryStatistics;
/// let stats: SummaryStatistics<i32> = [0, 1, 2, 3].into_iter().collect();
/// assert_eq!(stats.count(), 4);
/// assert_eq!(stats.sum(), 6);
/// assert_eq!(stats.min(), Some(0));
/// assert_eq!(stats.max(), Some(3));
/// assert_eq!(stats.average(), Some(1.5));
/// ```
#[derive(Debug, Clone)]
pub struct SummaryStatistics<T: Element> {
    count: u64,
    sum: T::Sum,
    min: Option<T>,
    max: Option<T>,
    moments: Moments,
}

impl<T: Element> SummaryStatistics<T> {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: T::Sum::default(),
            min: None,
            max: None,
            moments: Moments::default(),
        }
    }

    /// Records one element.
    pub fn accept(&mut self, value: T) {
        self.count += 1;
        self.sum.add(value);
        self.min = Some(self.min.map_or(value, |m| m.lesser(value)));
        self.max = Some(self.max.map_or(value, |m| m.greater(value)));
        self.moments.update(value.to_f64());
    }

    /// Folds statistics gathered elsewhere (e.g. by another worker) into
    /// these.
    pub fn combine(&mut self, other: &SummaryStatistics<T>) {
        self.count += other.count;
        self.sum.merge(&other.sum);
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.lesser(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.greater(b)),
            (a, b) => a.or(b),
        };
        self.moments.merge(&other.moments);
    }

    /// Number of recorded elements.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of recorded elements; zero when empty.
    pub fn sum(&self) -> Total<T> {
        self.sum.total()
    }

    /// Smallest element, or `None` when empty.
    pub fn min(&self) -> Option<T> {
        self.min
    }

    /// Largest element, or `None` when empty.
    pub fn max(&self) -> Option<T> {
        self.max
    }

    /// `sum / count`, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum.total_f64() / self.count as f64)
        }
    }

    /// Sample variance (n − 1 denominator), or `None` with fewer than 2
    /// elements.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.moments.m2 / (self.count - 1) as f64)
        }
    }

    /// Population variance (n denominator), or `None` when empty.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.moments.m2 / self.count as f64)
        }
    }

    /// Square root of [`sample_variance`](Self::sample_variance).
    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Square root of [`population_variance`](Self::population_variance).
    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }
}

impl<T: Element> Default for SummaryStatistics<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Extend<T> for SummaryStatistics<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.accept(value);
        }
    }
}

impl<T: Element> FromIterator<T> for SummaryStatistics<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

impl<T: Element> fmt::Display for SummaryStatistics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}SummaryStatistics{{count={}, sum={}", T::KIND, self.count, self.sum())?;
        match (self.min, self.average(), self.max) {
            (Some(min), Some(avg), Some(max)) => {
                write!(f, ", min={min:?}, average={avg}, max={max:?}}}")
            }
            _ => write!(f, "}}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
